use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{LoginHistoryRepository, UserRepository, VerificationCodeRepository};
use crate::error::{UserError, UserResult};
use crate::models::{
    CodePurpose, LoginHistory, LoginHistoryQuery, NewLoginRecord, NewUser, NewVerificationCode,
    ProfileChanges, Role, User, UserQuery, VerificationCode,
};

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn page<T>(rows: Vec<T>, page_num: u64, page_size: u64) -> Vec<T> {
    let offset = (page_num - 1).saturating_mul(page_size) as usize;
    rows.into_iter().skip(offset).take(page_size as usize).collect()
}

#[derive(Debug, Default)]
struct UserTable {
    next_id: i64,
    rows: HashMap<i64, User>,
}

impl UserTable {
    fn live(&self) -> impl Iterator<Item = &User> {
        self.rows.values().filter(|u| !u.deleted)
    }

    fn live_mut(&mut self, id: i64) -> Option<&mut User> {
        self.rows.get_mut(&id).filter(|u| !u.deleted)
    }

    fn conflict(&self, phone: Option<&str>, email: Option<&str>, exclude: i64) -> Option<UserError> {
        let others = || self.live().filter(move |u| u.id != exclude);
        if let Some(phone) = phone {
            if others().any(|u| u.phone.as_deref() == Some(phone)) {
                return Some(UserError::DuplicatePhone);
            }
        }
        if let Some(email) = email {
            if others().any(|u| u.email.as_deref() == Some(email)) {
                return Some(UserError::DuplicateEmail);
            }
        }
        None
    }
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<UserTable>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed row, e.g. an administrator seeded by a test.
    pub async fn insert(&self, user: User) {
        let mut table = self.table.write().await;
        table.next_id = table.next_id.max(user.id);
        table.rows.insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> UserResult<i64> {
        let mut table = self.table.write().await;

        if table.live().any(|u| u.account == user.account) {
            return Err(UserError::DuplicateAccount);
        }
        if let Some(err) = table.conflict(user.phone.as_deref(), user.email.as_deref(), 0) {
            return Err(err);
        }

        table.next_id += 1;
        let id = table.next_id;
        let now = Utc::now();
        table.rows.insert(
            id,
            User {
                id,
                username: None,
                account: user.account,
                avatar_url: None,
                gender: None,
                password: user.password,
                phone: user.phone,
                email: user.email,
                status: user.status,
                role: user.role,
                deleted: false,
                create_time: now,
                update_time: now,
            },
        );

        tracing::info!(user_id = id, "Created user");
        Ok(id)
    }

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.live().find(|u| u.id == id).cloned())
    }

    async fn find_by_account(&self, account: &str) -> UserResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.live().find(|u| u.account == account).cloned())
    }

    async fn account_exists(&self, account: &str) -> UserResult<bool> {
        let table = self.table.read().await;
        Ok(table.live().any(|u| u.account == account))
    }

    async fn phone_exists(&self, phone: &str, exclude_id: Option<i64>) -> UserResult<bool> {
        let table = self.table.read().await;
        Ok(table
            .live()
            .any(|u| Some(u.id) != exclude_id && u.phone.as_deref() == Some(phone)))
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> UserResult<bool> {
        let table = self.table.read().await;
        Ok(table
            .live()
            .any(|u| Some(u.id) != exclude_id && u.email.as_deref() == Some(email)))
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> UserResult<Option<User>> {
        let mut table = self.table.write().await;

        if let Some(err) = table.conflict(changes.phone.as_deref(), changes.email.as_deref(), id) {
            return Err(err);
        }

        Ok(table.live_mut(id).map(|user| {
            changes.apply(user);
            user.update_time = Utc::now();
            user.clone()
        }))
    }

    async fn update_password(&self, id: i64, digest: String) -> UserResult<bool> {
        let mut table = self.table.write().await;
        Ok(table.live_mut(id).map(|u| u.password = digest).is_some())
    }

    async fn update_status(&self, id: i64, status: i16) -> UserResult<bool> {
        let mut table = self.table.write().await;
        Ok(table.live_mut(id).map(|u| u.status = status).is_some())
    }

    async fn update_role(&self, id: i64, role: Role) -> UserResult<bool> {
        let mut table = self.table.write().await;
        Ok(table.live_mut(id).map(|u| u.role = role).is_some())
    }

    async fn soft_delete(&self, id: i64) -> UserResult<bool> {
        let mut table = self.table.write().await;
        let deleted = table.live_mut(id).map(|u| u.deleted = true).is_some();
        if deleted {
            tracing::info!(user_id = id, "Soft-deleted user");
        }
        Ok(deleted)
    }

    async fn list_all(&self) -> UserResult<Vec<User>> {
        let table = self.table.read().await;
        let mut users: Vec<User> = table.live().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn query(&self, query: UserQuery) -> UserResult<(Vec<User>, u64)> {
        let table = self.table.read().await;
        let keyword = query.keyword();

        let mut matches: Vec<User> = table
            .live()
            .filter(|u| {
                keyword.is_none_or(|kw| {
                    contains_ignore_case(&u.account, kw)
                        || u.username.as_deref().is_some_and(|n| contains_ignore_case(n, kw))
                })
            })
            .filter(|u| query.role.is_none_or(|r| u.role == r))
            .filter(|u| query.gender.is_none_or(|g| u.gender == Some(g)))
            .filter(|u| query.status.is_none_or(|s| u.status == s))
            .filter(|u| query.create_time_start.is_none_or(|t| u.create_time >= t))
            .filter(|u| query.create_time_end.is_none_or(|t| u.create_time <= t))
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.create_time.cmp(&a.create_time).then(b.id.cmp(&a.id)));

        let total = matches.len() as u64;
        let (page_num, page_size) = query.page();
        Ok((page(matches, page_num, page_size), total))
    }
}

/// In-memory verification codes. Check and insert share one write lock.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVerificationCodeRepository {
    codes: Arc<RwLock<Vec<VerificationCode>>>,
}

impl InMemoryVerificationCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored code for a target, oldest first.
    pub async fn codes_for(&self, target: &str) -> Vec<VerificationCode> {
        let codes = self.codes.read().await;
        codes.iter().filter(|c| c.target == target).cloned().collect()
    }
}

#[async_trait]
impl VerificationCodeRepository for InMemoryVerificationCodeRepository {
    async fn insert_unless_recent(
        &self,
        code: NewVerificationCode,
        window_start: DateTime<Utc>,
    ) -> UserResult<Option<i64>> {
        let mut codes = self.codes.write().await;

        let recent = codes.iter().any(|c| {
            c.target == code.target && c.purpose == code.purpose && c.create_time > window_start
        });
        if recent {
            return Ok(None);
        }

        let id = codes.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        codes.push(VerificationCode {
            id,
            target: code.target,
            target_type: code.target_type,
            code: code.code,
            purpose: code.purpose,
            expire_time: code.expire_time,
            used: false,
            create_time: code.create_time,
        });
        Ok(Some(id))
    }

    async fn delete(&self, id: i64) -> UserResult<()> {
        let mut codes = self.codes.write().await;
        codes.retain(|c| c.id != id);
        Ok(())
    }

    async fn consume(
        &self,
        target: &str,
        purpose: CodePurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> UserResult<bool> {
        let mut codes = self.codes.write().await;

        let newest = codes
            .iter_mut()
            .filter(|c| c.target == target && c.purpose == purpose && !c.used && c.expire_time > now)
            .max_by(|a, b| a.create_time.cmp(&b.create_time).then(a.id.cmp(&b.id)));

        match newest {
            Some(row) if row.code == code => {
                row.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory login history.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLoginHistoryRepository {
    rows: Arc<RwLock<Vec<LoginHistory>>>,
}

impl InMemoryLoginHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<LoginHistory> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl LoginHistoryRepository for InMemoryLoginHistoryRepository {
    async fn record(&self, record: NewLoginRecord) -> UserResult<()> {
        let mut rows = self.rows.write().await;
        let id = rows.len() as i64 + 1;
        rows.push(LoginHistory {
            id,
            user_id: record.user_id,
            account: record.account,
            login_time: record.login_time,
            ip_address: record.ip_address,
            user_agent: record.user_agent,
            login_status: record.login_status,
            fail_reason: record.fail_reason,
        });
        Ok(())
    }

    async fn query(&self, query: LoginHistoryQuery) -> UserResult<(Vec<LoginHistory>, u64)> {
        let rows = self.rows.read().await;
        let account = query.account();

        let mut matches: Vec<LoginHistory> = rows
            .iter()
            .filter(|r| query.user_id.is_none_or(|id| r.user_id == Some(id)))
            .filter(|r| account.is_none_or(|a| contains_ignore_case(&r.account, a)))
            .filter(|r| query.login_status.is_none_or(|s| r.login_status == s))
            .filter(|r| query.login_time_start.is_none_or(|t| r.login_time >= t))
            .filter(|r| query.login_time_end.is_none_or(|t| r.login_time <= t))
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.login_time.cmp(&a.login_time).then(b.id.cmp(&a.id)));

        let total = matches.len() as u64;
        let (page_num, page_size) = query.page();
        Ok((page(matches, page_num, page_size), total))
    }
}
