use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 provider_links 表 - 外部身份与用户的绑定关系
        manager
            .create_table(
                Table::create()
                    .table(ProviderLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderLinks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProviderLinks::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(ProviderLinks::Provider)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderLinks::ExternalId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderLinks::Email)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProviderLinks::AccessToken).text().not_null())
                    .col(ColumnDef::new(ProviderLinks::RefreshToken).text())
                    .col(ColumnDef::new(ProviderLinks::TokenExpiresAt).timestamp())
                    .col(
                        ColumnDef::new(ProviderLinks::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ProviderLinks::ProfileData)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(ProviderLinks::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ProviderLinks::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_links_user_id")
                            .from(ProviderLinks::Table, ProviderLinks::UserId)
                            .to(Users::Table, Users::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 一个外部身份只能对应一个用户
        manager
            .create_index(
                Index::create()
                    .name("uk_provider_links_provider_external_id")
                    .table(ProviderLinks::Table)
                    .col(ProviderLinks::Provider)
                    .col(ProviderLinks::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 一个用户在同一 provider 下最多绑定一次
        manager
            .create_index(
                Index::create()
                    .name("uk_provider_links_user_id_provider")
                    .table(ProviderLinks::Table)
                    .col(ProviderLinks::UserId)
                    .col(ProviderLinks::Provider)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProviderLinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProviderLinks {
    Table,
    Id,
    UserId,
    Provider,
    ExternalId,
    Email,
    AccessToken,
    RefreshToken,
    TokenExpiresAt,
    IsVerified,
    ProfileData,
    CreatedAt,
    UpdatedAt,
}
