//! Persistence traits and their in-memory and Postgres implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::UserResult;
use crate::models::{
    CodePurpose, LoginHistory, LoginHistoryQuery, NewLoginRecord, NewUser, NewVerificationCode,
    ProfileChanges, Role, User, UserQuery,
};

mod memory;
mod postgres;

pub use memory::{
    InMemoryLoginHistoryRepository, InMemoryUserRepository, InMemoryVerificationCodeRepository,
};
pub use postgres::{PgLoginHistoryRepository, PgUserRepository, PgVerificationCodeRepository};

/// Account storage. Every lookup ignores soft-deleted rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account and return its id.
    ///
    /// A concurrent insert with the same account surfaces as `UserError::DuplicateAccount`.
    async fn create(&self, user: NewUser) -> UserResult<i64>;

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>>;

    async fn find_by_account(&self, account: &str) -> UserResult<Option<User>>;

    async fn account_exists(&self, account: &str) -> UserResult<bool>;

    /// Whether another live account already uses this phone number.
    async fn phone_exists(&self, phone: &str, exclude_id: Option<i64>) -> UserResult<bool>;

    /// Whether another live account already uses this email address.
    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> UserResult<bool>;

    /// Apply the present fields and return the updated row, `None` if the account is gone.
    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> UserResult<Option<User>>;

    async fn update_password(&self, id: i64, digest: String) -> UserResult<bool>;

    async fn update_status(&self, id: i64, status: i16) -> UserResult<bool>;

    async fn update_role(&self, id: i64, role: Role) -> UserResult<bool>;

    /// Mark the account deleted. `false` if nothing changed.
    async fn soft_delete(&self, id: i64) -> UserResult<bool>;

    async fn list_all(&self) -> UserResult<Vec<User>>;

    /// One page of matching accounts plus the total match count.
    async fn query(&self, query: UserQuery) -> UserResult<(Vec<User>, u64)>;
}

/// Verification-code storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerificationCodeRepository: Send + Sync {
    /// Atomically insert `code` unless a code for the same target and purpose was
    /// created after `window_start`. Returns the new id, or `None` when rate limited.
    async fn insert_unless_recent(
        &self,
        code: NewVerificationCode,
        window_start: DateTime<Utc>,
    ) -> UserResult<Option<i64>>;

    async fn delete(&self, id: i64) -> UserResult<()>;

    /// Atomically mark the newest unused, unexpired code for (target, purpose) as used
    /// if it equals `code`. Returns whether it did.
    async fn consume(
        &self,
        target: &str,
        purpose: CodePurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> UserResult<bool>;
}

/// Append-only login audit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginHistoryRepository: Send + Sync {
    async fn record(&self, record: NewLoginRecord) -> UserResult<()>;

    /// One page of matching attempts, newest first, plus the total.
    async fn query(&self, query: LoginHistoryQuery) -> UserResult<(Vec<LoginHistory>, u64)>;
}
