use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{UserError, UserResult};
use crate::models::{
    LoginHistory, LoginHistoryQuery, PageResult, Role, STATUS_DISABLED, STATUS_NORMAL, User,
    UserQuery, UserResponse,
};
use crate::repository::{LoginHistoryRepository, UserRepository};

/// Administrator operations over every account.
#[derive(Clone)]
pub struct AdminService {
    users: Arc<dyn UserRepository>,
    history: Arc<dyn LoginHistoryRepository>,
}

impl AdminService {
    pub fn new(users: Arc<dyn UserRepository>, history: Arc<dyn LoginHistoryRepository>) -> Self {
        Self { users, history }
    }

    async fn existing(&self, id: i64) -> UserResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| UserError::NotFound("user not found".to_string()))
    }

    pub async fn query_users(&self, query: UserQuery) -> UserResult<PageResult<UserResponse>> {
        let (page_num, page_size) = query.page();
        let (records, total) = self.users.query(query).await?;
        Ok(PageResult::new(records, total, page_num, page_size).map(UserResponse::from))
    }

    pub async fn list_users(&self) -> UserResult<Vec<UserResponse>> {
        let users = self.users.list_all().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn get_user(&self, id: i64) -> UserResult<UserResponse> {
        self.existing(id).await.map(UserResponse::from)
    }

    /// Soft delete. Administrators cannot delete themselves.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, actor_id: i64, id: i64) -> UserResult<bool> {
        if actor_id == id {
            return Err(UserError::Validation(
                "you cannot delete your own account".to_string(),
            ));
        }
        self.users.soft_delete(id).await
    }

    /// Set the status to 0 (normal) or 1 (disabled). Unchanged values skip the write.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: i64, status: i16) -> UserResult<bool> {
        if status != STATUS_NORMAL && status != STATUS_DISABLED {
            return Err(UserError::Validation(
                "status must be 0 (normal) or 1 (disabled)".to_string(),
            ));
        }

        let user = self.existing(id).await?;
        if user.status == status {
            return Ok(true);
        }

        if !self.users.update_status(id, status).await? {
            return Err(UserError::NotFound("user not found".to_string()));
        }
        info!(user_id = id, status, "User status changed");
        Ok(true)
    }

    #[instrument(skip(self))]
    pub async fn update_role(&self, id: i64, role: Role) -> UserResult<bool> {
        let user = self.existing(id).await?;
        if user.role == role {
            return Ok(true);
        }

        if !self.users.update_role(id, role).await? {
            return Err(UserError::NotFound("user not found".to_string()));
        }
        info!(user_id = id, %role, "User role changed");
        Ok(true)
    }

    pub async fn query_login_history(
        &self,
        query: LoginHistoryQuery,
    ) -> UserResult<PageResult<LoginHistory>> {
        let (page_num, page_size) = query.page();
        let (records, total) = self.history.query(query).await?;
        Ok(PageResult::new(records, total, page_num, page_size))
    }
}
