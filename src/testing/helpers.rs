//! # 测试辅助函数
//!
//! 提供通用的测试工具和辅助函数

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::sync::Once;
use tracing::Level;

use crate::auth::credential_cipher::CredentialCipher;
use crate::auth::jwt::TokenIssuer;
use crate::config::{AppConfig, JwtConfig};

/// 测试用 JWT 密钥（32 字节以上）
pub const TEST_JWT_SECRET: &str = "test-secret-key-for-jwt-testing-0123456789";

/// 测试用凭证加密密钥材料
pub const TEST_ENCRYPTION_SECRET: &str = "test-encryption-secret-0123456789abcdef";

static INIT: Once = Once::new();

/// 初始化测试环境
pub fn init_test_env() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 创建内存数据库连接
pub async fn create_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // 运行迁移
    migration::Migrator::up(&db, None).await?;

    Ok(db)
}

/// 可通过校验的最小配置
#[must_use]
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.jwt.secret = TEST_JWT_SECRET.to_string();
    config.oauth.encryption_key = Some(TEST_ENCRYPTION_SECRET.to_string());
    config.database.url = "sqlite::memory:".to_string();
    config
}

/// 测试用令牌签发器
#[must_use]
pub fn test_token_issuer() -> TokenIssuer {
    TokenIssuer::new(&JwtConfig {
        secret: TEST_JWT_SECRET.to_string(),
        ..JwtConfig::default()
    })
    .expect("测试 JWT 配置有效")
}

/// 测试用凭证加密器
#[must_use]
pub fn test_cipher() -> CredentialCipher {
    CredentialCipher::from_secret(TEST_ENCRYPTION_SECRET.as_bytes()).expect("测试密钥长度足够")
}
