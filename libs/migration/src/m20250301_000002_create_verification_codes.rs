use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VerificationCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VerificationCodes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string_len(VerificationCodes::Target, 100))
                    .col(string_len(VerificationCodes::TargetType, 16))
                    .col(string_len(VerificationCodes::Code, 16))
                    .col(string_len(VerificationCodes::Purpose, 32))
                    .col(timestamp_with_time_zone(VerificationCodes::ExpireTime))
                    .col(boolean(VerificationCodes::Used).default(false))
                    .col(
                        timestamp_with_time_zone(VerificationCodes::CreateTime)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Serves both the rate-limit probe and the newest-valid-code lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_verification_codes_lookup")
                    .table(VerificationCodes::Table)
                    .col(VerificationCodes::Target)
                    .col(VerificationCodes::Purpose)
                    .col(VerificationCodes::CreateTime)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VerificationCodes::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum VerificationCodes {
    Table,
    Id,
    Target,
    TargetType,
    Code,
    Purpose,
    ExpireTime,
    Used,
    CreateTime,
}
