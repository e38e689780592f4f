use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, Statement,
    TransactionTrait,
};

use super::{LoginHistoryRepository, UserRepository, VerificationCodeRepository};
use crate::entity::{login_history, user, verification_code};
use crate::error::{UserError, UserResult};
use crate::models::{
    CodePurpose, LoginHistory, LoginHistoryQuery, NewLoginRecord, NewUser, NewVerificationCode,
    ProfileChanges, Role, User, UserQuery,
};

/// Maps partial-unique-index violations to their business error.
fn map_unique_violation(err: DbErr) -> UserError {
    if let Some(SqlErr::UniqueConstraintViolation(message)) = err.sql_err() {
        if message.contains("uq_users_account_active") {
            return UserError::DuplicateAccount;
        }
        if message.contains("uq_users_phone_active") {
            return UserError::DuplicatePhone;
        }
        if message.contains("uq_users_email_active") {
            return UserError::DuplicateEmail;
        }
    }
    UserError::Database(err)
}

/// Substring pattern for `ILIKE .. ESCAPE '!'`; wildcards in `term` match literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '!' | '%' | '_') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn offset(page_num: u64, page_size: u64) -> u64 {
    (page_num - 1).saturating_mul(page_size)
}

#[derive(Debug, FromQueryResult)]
struct IdRow {
    id: i64,
}

pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn live() -> sea_orm::Select<user::Entity> {
        user::Entity::find().filter(user::Column::Deleted.eq(false))
    }

    fn update_live() -> sea_orm::UpdateMany<user::Entity> {
        user::Entity::update_many().filter(user::Column::Deleted.eq(false))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, input: NewUser) -> UserResult<i64> {
        let active_model: user::ActiveModel = input.into();

        let result = user::Entity::insert(active_model)
            .exec(&self.db)
            .await
            .map_err(map_unique_violation)?;

        tracing::info!(user_id = result.last_insert_id, "Created user");
        Ok(result.last_insert_id)
    }

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let model = Self::live()
            .filter(user::Column::Id.eq(id))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_account(&self, account: &str) -> UserResult<Option<User>> {
        let model = Self::live()
            .filter(user::Column::Account.eq(account))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn account_exists(&self, account: &str) -> UserResult<bool> {
        let count = Self::live()
            .filter(user::Column::Account.eq(account))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn phone_exists(&self, phone: &str, exclude_id: Option<i64>) -> UserResult<bool> {
        let mut query = Self::live().filter(user::Column::Phone.eq(phone));
        if let Some(id) = exclude_id {
            query = query.filter(user::Column::Id.ne(id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> UserResult<bool> {
        let mut query = Self::live().filter(user::Column::Email.eq(email));
        if let Some(id) = exclude_id {
            query = query.filter(user::Column::Id.ne(id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> UserResult<Option<User>> {
        if changes.is_empty() {
            return self.find_by_id(id).await;
        }

        let mut update = Self::update_live().filter(user::Column::Id.eq(id));
        if let Some(username) = changes.username {
            update = update.col_expr(user::Column::Username, Expr::value(username));
        }
        if let Some(avatar_url) = changes.avatar_url {
            update = update.col_expr(user::Column::AvatarUrl, Expr::value(avatar_url));
        }
        if let Some(gender) = changes.gender {
            update = update.col_expr(user::Column::Gender, Expr::value(gender));
        }
        if let Some(phone) = changes.phone {
            update = update.col_expr(user::Column::Phone, Expr::value(phone));
        }
        if let Some(email) = changes.email {
            update = update.col_expr(user::Column::Email, Expr::value(email));
        }

        let result = update.exec(&self.db).await.map_err(map_unique_violation)?;
        if result.rows_affected == 0 {
            return Ok(None);
        }

        tracing::info!(user_id = id, "Updated profile");
        self.find_by_id(id).await
    }

    async fn update_password(&self, id: i64, digest: String) -> UserResult<bool> {
        let result = Self::update_live()
            .col_expr(user::Column::Password, Expr::value(digest))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn update_status(&self, id: i64, status: i16) -> UserResult<bool> {
        let result = Self::update_live()
            .col_expr(user::Column::Status, Expr::value(status))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn update_role(&self, id: i64, role: Role) -> UserResult<bool> {
        let result = Self::update_live()
            .col_expr(user::Column::Role, Expr::value(role.to_string()))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn soft_delete(&self, id: i64) -> UserResult<bool> {
        let result = Self::update_live()
            .col_expr(user::Column::Deleted, Expr::value(true))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            tracing::info!(user_id = id, "Soft-deleted user");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn list_all(&self) -> UserResult<Vec<User>> {
        let models = Self::live()
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn query(&self, query: UserQuery) -> UserResult<(Vec<User>, u64)> {
        let mut select = Self::live();

        if let Some(keyword) = query.keyword() {
            let pattern = like_pattern(keyword);
            select = select.filter(Expr::cust_with_values(
                "(username ILIKE ? ESCAPE '!' OR account ILIKE ? ESCAPE '!')",
                [pattern.clone(), pattern],
            ));
        }
        if let Some(role) = query.role {
            select = select.filter(user::Column::Role.eq(role.to_string()));
        }
        if let Some(gender) = query.gender {
            select = select.filter(user::Column::Gender.eq(gender));
        }
        if let Some(status) = query.status {
            select = select.filter(user::Column::Status.eq(status));
        }
        if let Some(start) = query.create_time_start {
            select = select.filter(user::Column::CreateTime.gte(start));
        }
        if let Some(end) = query.create_time_end {
            select = select.filter(user::Column::CreateTime.lte(end));
        }

        let total = select.clone().count(&self.db).await?;

        let (page_num, page_size) = query.page();
        let models = select
            .order_by_desc(user::Column::CreateTime)
            .order_by_desc(user::Column::Id)
            .offset(offset(page_num, page_size))
            .limit(page_size)
            .all(&self.db)
            .await?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }
}

pub struct PgVerificationCodeRepository {
    db: DatabaseConnection,
}

impl PgVerificationCodeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VerificationCodeRepository for PgVerificationCodeRepository {
    async fn insert_unless_recent(
        &self,
        code: NewVerificationCode,
        window_start: DateTime<Utc>,
    ) -> UserResult<Option<i64>> {
        let txn = self.db.begin().await?;

        // Serializes concurrent sends for one target+purpose until commit.
        let lock_key = format!("{}:{}", code.target, code.purpose);
        let lock = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_advisory_xact_lock(hashtext($1))",
            [lock_key.into()],
        );
        txn.execute_raw(lock).await?;

        let recent = verification_code::Entity::find()
            .filter(verification_code::Column::Target.eq(code.target.as_str()))
            .filter(verification_code::Column::Purpose.eq(code.purpose.to_string()))
            .filter(verification_code::Column::CreateTime.gt(window_start))
            .count(&txn)
            .await?;
        if recent > 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let active_model: verification_code::ActiveModel = code.into();
        let result = verification_code::Entity::insert(active_model)
            .exec(&txn)
            .await?;
        txn.commit().await?;

        Ok(Some(result.last_insert_id))
    }

    async fn delete(&self, id: i64) -> UserResult<()> {
        verification_code::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn consume(
        &self,
        target: &str,
        purpose: CodePurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> UserResult<bool> {
        let sql = r#"
            UPDATE verification_codes SET used = true
            WHERE id = (
                SELECT id FROM verification_codes
                WHERE target = $1 AND purpose = $2 AND used = false AND expire_time > $3
                ORDER BY create_time DESC, id DESC
                LIMIT 1
            )
            AND code = $4 AND used = false
            RETURNING id
        "#;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                target.into(),
                purpose.to_string().into(),
                now.into(),
                code.into(),
            ],
        );

        let row = IdRow::find_by_statement(stmt).one(&self.db).await?;
        Ok(row.is_some_and(|r| r.id > 0))
    }
}

pub struct PgLoginHistoryRepository {
    db: DatabaseConnection,
}

impl PgLoginHistoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LoginHistoryRepository for PgLoginHistoryRepository {
    async fn record(&self, record: NewLoginRecord) -> UserResult<()> {
        let active_model: login_history::ActiveModel = record.into();
        login_history::Entity::insert(active_model)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn query(&self, query: LoginHistoryQuery) -> UserResult<(Vec<LoginHistory>, u64)> {
        let mut select = login_history::Entity::find();

        if let Some(user_id) = query.user_id {
            select = select.filter(login_history::Column::UserId.eq(user_id));
        }
        if let Some(account) = query.account() {
            select = select.filter(Expr::cust_with_values(
                "account ILIKE ? ESCAPE '!'",
                [like_pattern(account)],
            ));
        }
        if let Some(status) = query.login_status {
            select = select.filter(login_history::Column::LoginStatus.eq(status));
        }
        if let Some(start) = query.login_time_start {
            select = select.filter(login_history::Column::LoginTime.gte(start));
        }
        if let Some(end) = query.login_time_end {
            select = select.filter(login_history::Column::LoginTime.lte(end));
        }

        let total = select.clone().count(&self.db).await?;

        let (page_num, page_size) = query.page();
        let models = select
            .order_by_desc(login_history::Column::LoginTime)
            .order_by_desc(login_history::Column::Id)
            .offset(offset(page_num, page_size))
            .limit(page_size)
            .all(&self.db)
            .await?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }
}
