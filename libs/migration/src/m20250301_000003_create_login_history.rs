use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LoginHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoginHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(big_integer_null(LoginHistory::UserId))
                    .col(string_len(LoginHistory::Account, 64))
                    .col(
                        timestamp_with_time_zone(LoginHistory::LoginTime)
                            .default(Expr::current_timestamp()),
                    )
                    .col(string_len_null(LoginHistory::IpAddress, 64))
                    .col(string_len_null(LoginHistory::UserAgent, 512))
                    .col(small_integer(LoginHistory::LoginStatus))
                    .col(string_len_null(LoginHistory::FailReason, 255))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_login_history_user_time")
                    .table(LoginHistory::Table)
                    .col(LoginHistory::UserId)
                    .col(LoginHistory::LoginTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_login_history_login_time")
                    .table(LoginHistory::Table)
                    .col(LoginHistory::LoginTime)
                    .to_owned(),
            )
            .await?;

        // Rows are an audit trail; reject edits at the storage layer too
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE OR REPLACE RULE login_history_no_update AS
                    ON UPDATE TO login_history DO INSTEAD NOTHING
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoginHistory::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum LoginHistory {
    Table,
    Id,
    UserId,
    Account,
    LoginTime,
    IpAddress,
    UserAgent,
    LoginStatus,
    FailReason,
}
