use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string_len_null(Users::Username, 50))
                    .col(string_len(Users::Account, 20))
                    .col(string_len_null(Users::AvatarUrl, 500))
                    .col(small_integer_null(Users::Gender))
                    .col(string(Users::Password))
                    .col(string_len_null(Users::Phone, 20))
                    .col(string_len_null(Users::Email, 100))
                    .col(small_integer(Users::Status).default(0))
                    .col(string_len(Users::Role, 16).default("USER"))
                    .col(boolean(Users::Deleted).default(false))
                    .col(
                        timestamp_with_time_zone(Users::CreateTime)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Users::UpdateTime)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        // Uniqueness only binds live rows so soft-deleted accounts free their names
        db.execute_unprepared(
            "CREATE UNIQUE INDEX uq_users_account_active ON users (account) WHERE deleted = false",
        )
        .await?;
        db.execute_unprepared(
            "CREATE UNIQUE INDEX uq_users_phone_active ON users (phone) \
             WHERE deleted = false AND phone IS NOT NULL",
        )
        .await?;
        db.execute_unprepared(
            "CREATE UNIQUE INDEX uq_users_email_active ON users (email) \
             WHERE deleted = false AND email IS NOT NULL",
        )
        .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_create_time")
                    .table(Users::Table)
                    .col(Users::CreateTime)
                    .to_owned(),
            )
            .await?;

        db.execute_unprepared(
            r#"
            CREATE TRIGGER users_touch_update_time
                BEFORE UPDATE ON users
                FOR EACH ROW
                EXECUTE FUNCTION util.touch_update_time()
            "#,
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TRIGGER IF EXISTS users_touch_update_time ON users")
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Account,
    AvatarUrl,
    Gender,
    Password,
    Phone,
    Email,
    Status,
    Role,
    Deleted,
    CreateTime,
    UpdateTime,
}
