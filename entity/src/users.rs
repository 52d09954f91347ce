//! # 用户实体定义
//!
//! 身份主体（Principal）表的 Sea-ORM 实体模型

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 用户实体
///
/// 通过第三方登录创建的账户没有密码哈希。
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::provider_links::Entity")]
    ProviderLinks,
}

impl Related<super::provider_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
