use axum_helpers::ClientContext;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::VerificationService;
use crate::clock::Clock;
use crate::error::{UserError, UserResult};
use crate::models::{
    ChangePasswordRequest, CodePurpose, EMAIL_PATTERN, LOGIN_FAILED, LOGIN_SUCCESS,
    LoginHistory, LoginHistoryQuery, LoginRequest, NewLoginRecord, NewUser, PHONE_PATTERN,
    PageParams, PageResult, ProfileChanges, RegisterRequest, Role, STATUS_NORMAL,
    USER_AGENT_MAX_LEN, User, UserResponse,
};
use crate::password::{hash_password, verify_password};
use crate::repository::{LoginHistoryRepository, UserRepository};

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn truncate_chars(value: String, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((cut, _)) => value[..cut].to_string(),
        None => value,
    }
}

/// Self-service account operations: registration, login and profile management.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    history: Arc<dyn LoginHistoryRepository>,
    verification: VerificationService,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        history: Arc<dyn LoginHistoryRepository>,
        verification: VerificationService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            history,
            verification,
            clock,
        }
    }

    pub fn verification(&self) -> &VerificationService {
        &self.verification
    }

    /// Register a new account and return its id.
    ///
    /// Exactly one of phone or email is given, and it is the verification target.
    /// Boundary validation (lengths, password confirmation) has already happened.
    #[instrument(skip_all, fields(account = %req.account))]
    pub async fn register(&self, req: RegisterRequest) -> UserResult<i64> {
        let phone = present(req.phone.as_deref());
        let email = present(req.email.as_deref());
        if phone.is_some() && email.is_some() {
            return Err(UserError::Validation(
                "provide either a phone number or an email, not both".to_string(),
            ));
        }

        if let Some(phone) = phone {
            if !PHONE_PATTERN.is_match(phone) {
                return Err(UserError::Validation("invalid phone number format".to_string()));
            }
            if self.users.phone_exists(phone, None).await? {
                return Err(UserError::DuplicatePhone);
            }
        }
        if let Some(email) = email {
            if !EMAIL_PATTERN.is_match(email) {
                return Err(UserError::Validation("invalid email format".to_string()));
            }
            if self.users.email_exists(email, None).await? {
                return Err(UserError::DuplicateEmail);
            }
        }

        let target = phone.or(email).ok_or_else(|| {
            UserError::Validation("phone or email must be provided".to_string())
        })?;

        let verified = self
            .verification
            .verify_code(target, &req.verification_code, CodePurpose::Register)
            .await?;
        if !verified {
            return Err(UserError::InvalidCode);
        }

        if self.users.account_exists(&req.account).await? {
            return Err(UserError::DuplicateAccount);
        }

        let digest = hash_password(&req.password)?;
        let id = self
            .users
            .create(NewUser {
                account: req.account,
                password: digest,
                phone: phone.map(str::to_string),
                email: email.map(str::to_string),
                role: Role::User,
                status: STATUS_NORMAL,
            })
            .await?;

        info!(user_id = id, "User registered");
        Ok(id)
    }

    /// Check credentials and record the attempt. Session issuance is up to the caller.
    #[instrument(skip_all, fields(account = %req.account))]
    pub async fn login(&self, req: &LoginRequest, client: &ClientContext) -> UserResult<User> {
        let user = match self.users.find_by_account(&req.account).await? {
            Some(user) if verify_password(&req.password, &user.password) => user,
            _ => {
                let err = UserError::InvalidCredentials;
                self.record_login(&req.account, None, client, Some(err.to_string()))
                    .await;
                warn!("Login rejected: bad credentials");
                return Err(err);
            }
        };

        if user.is_disabled() {
            let err = UserError::AccountDisabled;
            self.record_login(&req.account, None, client, Some(err.to_string()))
                .await;
            warn!(user_id = user.id, "Login rejected: account disabled");
            return Err(err);
        }

        self.record_login(&user.account, Some(user.id), client, None)
            .await;
        info!(user_id = user.id, "User logged in");
        Ok(user)
    }

    /// Append a login-history row. Storage failures are logged, never surfaced.
    async fn record_login(
        &self,
        account: &str,
        user_id: Option<i64>,
        client: &ClientContext,
        fail_reason: Option<String>,
    ) {
        let record = NewLoginRecord {
            user_id,
            account: account.to_string(),
            login_time: self.clock.now(),
            ip_address: client.ip.clone(),
            user_agent: client
                .user_agent
                .clone()
                .map(|ua| truncate_chars(ua, USER_AGENT_MAX_LEN)),
            login_status: if fail_reason.is_some() {
                LOGIN_FAILED
            } else {
                LOGIN_SUCCESS
            },
            fail_reason,
        };

        if let Err(e) = self.history.record(record).await {
            error!(error = %e, "Failed to record login history");
        }
    }

    /// The signed-in user, re-read so role and status changes show up.
    pub async fn current(&self, user_id: i64) -> UserResult<UserResponse> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| UserError::Unauthorized("not logged in".to_string()))
    }

    pub async fn profile(&self, user_id: i64) -> UserResult<UserResponse> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| UserError::NotFound("user not found".to_string()))
    }

    /// Apply the present profile fields and return the updated view.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(
        &self,
        user_id: i64,
        changes: ProfileChanges,
    ) -> UserResult<UserResponse> {
        if let Some(phone) = changes.phone.as_deref() {
            if self.users.phone_exists(phone, Some(user_id)).await? {
                return Err(UserError::DuplicatePhone);
            }
        }
        if let Some(email) = changes.email.as_deref() {
            if self.users.email_exists(email, Some(user_id)).await? {
                return Err(UserError::DuplicateEmail);
            }
        }

        self.users
            .update_profile(user_id, changes)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| UserError::NotFound("user not found".to_string()))
    }

    #[instrument(skip(self, req))]
    pub async fn change_password(&self, user_id: i64, req: ChangePasswordRequest) -> UserResult<bool> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| UserError::NotFound("user not found".to_string()))?;

        if !verify_password(&req.old_password, &user.password) {
            return Err(UserError::Validation("old password is incorrect".to_string()));
        }
        if req.new_password != req.check_password {
            return Err(UserError::Validation("new passwords do not match".to_string()));
        }
        if req.new_password == req.old_password {
            return Err(UserError::Validation(
                "new password must differ from the old one".to_string(),
            ));
        }

        let digest = hash_password(&req.new_password)?;
        if !self.users.update_password(user_id, digest).await? {
            return Err(UserError::NotFound("user not found".to_string()));
        }

        info!("Password changed");
        Ok(true)
    }

    pub async fn login_history(
        &self,
        user_id: i64,
        page: PageParams,
    ) -> UserResult<PageResult<LoginHistory>> {
        let query = LoginHistoryQuery::for_user(user_id, page);
        let (page_num, page_size) = query.page();
        let (records, total) = self.history.query(query).await?;
        Ok(PageResult::new(records, total, page_num, page_size))
    }
}
