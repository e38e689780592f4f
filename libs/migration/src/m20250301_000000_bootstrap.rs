use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared("CREATE SCHEMA IF NOT EXISTS util").await?;

        // Maintains `update_time` on every table that opts in with a trigger
        db.execute_unprepared(
            r#"
            CREATE OR REPLACE FUNCTION util.touch_update_time()
            RETURNS TRIGGER AS $$
            BEGIN
                NEW.update_time = NOW();
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql
            "#,
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP FUNCTION IF EXISTS util.touch_update_time()")
            .await?;
        db.execute_unprepared("DROP SCHEMA IF EXISTS util").await?;
        Ok(())
    }
}
