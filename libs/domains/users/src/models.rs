use chrono::{DateTime, Utc};
use regex::Regex;
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::LazyLock;
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Mainland mobile number.
pub static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1[3-9]\d{9}$").unwrap());

pub static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+$").unwrap());

static ACCOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

pub const STATUS_NORMAL: i16 = 0;
pub const STATUS_DISABLED: i16 = 1;

pub const LOGIN_SUCCESS: i16 = 0;
pub const LOGIN_FAILED: i16 = 1;

pub const CODE_LENGTH: usize = 6;
pub const CODE_EXPIRE_MINUTES: i64 = 5;
pub const SEND_INTERVAL_SECONDS: i64 = 60;

/// Longest user agent kept in login history.
pub const USER_AGENT_MAX_LEN: usize = 512;

pub const DEFAULT_PAGE_NUM: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    #[sea_orm(string_value = "USER")]
    User,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

/// Delivery channel of a verification code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    #[sea_orm(string_value = "PHONE")]
    Phone,
    #[sea_orm(string_value = "EMAIL")]
    Email,
}

impl TargetType {
    /// Classifies a phone number or email address; `None` for anything else.
    pub fn classify(target: &str) -> Option<Self> {
        if PHONE_PATTERN.is_match(target) {
            Some(Self::Phone)
        } else if EMAIL_PATTERN.is_match(target) {
            Some(Self::Email)
        } else {
            None
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CodePurpose {
    #[default]
    #[sea_orm(string_value = "REGISTER")]
    Register,
    #[sea_orm(string_value = "RESET_PASSWORD")]
    ResetPassword,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn validate_account(account: &str) -> Result<(), ValidationError> {
    if !ACCOUNT_PATTERN.is_match(account) {
        return Err(invalid(
            "invalid_account",
            "account may only contain letters, digits and underscores",
        ));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if !PHONE_PATTERN.is_match(phone) {
        return Err(invalid("invalid_phone", "invalid phone number format"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_PATTERN.is_match(email) {
        return Err(invalid("invalid_email", "invalid email format"));
    }
    Ok(())
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "must not be blank"));
    }
    Ok(())
}

fn register_passwords_match(req: &RegisterRequest) -> Result<(), ValidationError> {
    if req.password != req.check_password {
        return Err(invalid("password_mismatch", "the two passwords do not match"));
    }
    Ok(())
}

/// A stored account. `password` holds the argon2 PHC string.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub account: String,
    pub avatar_url: Option<String>,
    pub gender: Option<i16>,
    pub password: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: i16,
    pub role: Role,
    pub deleted: bool,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl User {
    pub fn is_disabled(&self) -> bool {
        self.status == STATUS_DISABLED
    }
}

/// The only serialized view of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: Option<String>,
    pub account: String,
    pub avatar_url: Option<String>,
    /// 0 female, 1 male, 2 undisclosed
    pub gender: Option<i16>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// 0 normal, 1 disabled
    pub status: i16,
    pub role: Role,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            account: user.account,
            avatar_url: user.avatar_url,
            gender: user.gender,
            phone: user.phone,
            email: user.email,
            status: user.status,
            role: user.role,
            create_time: user.create_time,
            update_time: user.update_time,
        }
    }
}

/// Insert shape for a new account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub account: String,
    pub password: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub status: i16,
}

/// Profile fields to overwrite; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub gender: Option<i16>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.avatar_url.is_none()
            && self.gender.is_none()
            && self.phone.is_none()
            && self.email.is_none()
    }

    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = Some(username);
        }
        if let Some(avatar_url) = self.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        if let Some(gender) = self.gender {
            user.gender = Some(gender);
        }
        if let Some(phone) = self.phone {
            user.phone = Some(phone);
        }
        if let Some(email) = self.email {
            user.email = Some(email);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationCode {
    pub id: i64,
    pub target: String,
    pub target_type: TargetType,
    pub code: String,
    pub purpose: CodePurpose,
    pub expire_time: DateTime<Utc>,
    pub used: bool,
    pub create_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVerificationCode {
    pub target: String,
    pub target_type: TargetType,
    pub code: String,
    pub purpose: CodePurpose,
    pub expire_time: DateTime<Utc>,
    pub create_time: DateTime<Utc>,
}

/// One login attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginHistory {
    pub id: i64,
    pub user_id: Option<i64>,
    pub account: String,
    pub login_time: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// 0 success, 1 failed
    pub login_status: i16,
    pub fail_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLoginRecord {
    pub user_id: Option<i64>,
    pub account: String,
    pub login_time: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub login_status: i16,
    pub fail_reason: Option<String>,
}

// Requests

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "register_passwords_match", skip_on_field_errors = false))]
pub struct RegisterRequest {
    #[validate(
        length(min = 6, max = 20, message = "account must be 6 to 20 characters"),
        custom(function = "validate_account")
    )]
    pub account: String,
    #[validate(length(min = 8, max = 30, message = "password must be 8 to 30 characters"))]
    pub password: String,
    pub check_password: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub verification_code: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeRequest {
    /// Phone number or email address
    #[serde(default)]
    pub target: String,
    /// Only `REGISTER` is accepted; the default
    #[serde(default)]
    pub purpose: Option<CodePurpose>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(
        length(min = 6, max = 20, message = "account must be 6 to 20 characters"),
        custom(function = "validate_account")
    )]
    pub account: String,
    #[validate(length(min = 8, max = 30, message = "password must be 8 to 30 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(max = 50, message = "username must be at most 50 characters"))]
    pub username: Option<String>,
    #[validate(length(max = 500, message = "avatar URL must be at most 500 characters"))]
    pub avatar_url: Option<String>,
    #[validate(range(min = 0, max = 2, message = "gender must be 0, 1 or 2"))]
    pub gender: Option<i16>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(
        length(max = 100, message = "email must be at most 100 characters"),
        custom(function = "validate_email")
    )]
    pub email: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            username: req.username,
            avatar_url: req.avatar_url,
            gender: req.gender,
            phone: req.phone,
            email: req.email,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(custom(function = "not_blank"))]
    pub old_password: String,
    #[validate(length(min = 8, max = 30, message = "password must be 8 to 30 characters"))]
    pub new_password: String,
    pub check_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    /// 0 normal, 1 disabled
    pub status: i16,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

fn default_page_num() -> i64 {
    DEFAULT_PAGE_NUM
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Page number at least 1.
pub fn clamp_page_num(page_num: i64) -> u64 {
    page_num.max(1) as u64
}

/// Page size within `1..=100`.
pub fn clamp_page_size(page_size: i64) -> u64 {
    page_size.clamp(1, MAX_PAGE_SIZE) as u64
}

/// Admin user search.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    /// Matched against username and account, case-insensitively
    pub keyword: Option<String>,
    pub role: Option<Role>,
    pub gender: Option<i16>,
    pub status: Option<i16>,
    pub create_time_start: Option<DateTime<Utc>>,
    pub create_time_end: Option<DateTime<Utc>>,
    #[serde(default = "default_page_num")]
    pub page_num: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            keyword: None,
            role: None,
            gender: None,
            status: None,
            create_time_start: None,
            create_time_end: None,
            page_num: DEFAULT_PAGE_NUM,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl UserQuery {
    /// Trimmed, non-empty keyword.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn page(&self) -> (u64, u64) {
        (clamp_page_num(self.page_num), clamp_page_size(self.page_size))
    }
}

/// Admin login-history search.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginHistoryQuery {
    pub user_id: Option<i64>,
    /// Case-insensitive substring of the attempted account
    pub account: Option<String>,
    pub login_status: Option<i16>,
    pub login_time_start: Option<DateTime<Utc>>,
    pub login_time_end: Option<DateTime<Utc>>,
    #[serde(default = "default_page_num")]
    pub page_num: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for LoginHistoryQuery {
    fn default() -> Self {
        Self {
            user_id: None,
            account: None,
            login_status: None,
            login_time_start: None,
            login_time_end: None,
            page_num: DEFAULT_PAGE_NUM,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl LoginHistoryQuery {
    pub fn for_user(user_id: i64, page: PageParams) -> Self {
        Self {
            user_id: Some(user_id),
            page_num: page.page_num,
            page_size: page.page_size,
            ..Self::default()
        }
    }

    pub fn account(&self) -> Option<&str> {
        self.account
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    pub fn page(&self) -> (u64, u64) {
        (clamp_page_num(self.page_num), clamp_page_size(self.page_size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    #[serde(default = "default_page_num")]
    #[param(default = 1, minimum = 1)]
    pub page_num: i64,
    #[serde(default = "default_page_size")]
    #[param(default = 10, minimum = 1, maximum = 100)]
    pub page_size: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page_num: DEFAULT_PAGE_NUM,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub records: Vec<T>,
    pub total: u64,
    pub page_num: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl<T> PageResult<T> {
    pub fn new(records: Vec<T>, total: u64, page_num: u64, page_size: u64) -> Self {
        Self {
            records,
            total,
            page_num,
            page_size,
            total_pages: total.div_ceil(page_size.max(1)),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            records: self.records.into_iter().map(f).collect(),
            total: self.total,
            page_num: self.page_num,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(password: &str, check: &str) -> RegisterRequest {
        RegisterRequest {
            account: "zixi_01".into(),
            password: password.into(),
            check_password: check.into(),
            phone: Some("13800138000".into()),
            email: None,
            verification_code: "123456".into(),
        }
    }

    #[test]
    fn test_classify_target() {
        assert_eq!(TargetType::classify("13800138000"), Some(TargetType::Phone));
        assert_eq!(TargetType::classify("a.b+c@example.com"), Some(TargetType::Email));
        assert_eq!(TargetType::classify("12800138000"), None);
        assert_eq!(TargetType::classify("not-a-target"), None);
    }

    #[test]
    fn test_register_request_validation() {
        assert!(register("password1", "password1").validate().is_ok());

        let errors = register("password1", "password2").validate().unwrap_err();
        assert!(errors.errors().contains_key("__all__"));

        let mut short = register("short", "short");
        short.account = "abc".into();
        let errors = short.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("account"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_register_rejects_blank_code_and_bad_account() {
        let mut req = register("password1", "password1");
        req.verification_code = "   ".into();
        req.account = "bad account".into();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("verification_code"));
        assert!(fields.contains_key("account"));
    }

    #[test]
    fn test_profile_validation() {
        let ok = UpdateProfileRequest {
            phone: Some("13912345678".into()),
            email: Some("me@example.com".into()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad = UpdateProfileRequest {
            phone: Some("12345".into()),
            gender: Some(7),
            ..Default::default()
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));
        assert!(errors.field_errors().contains_key("gender"));
    }

    #[test]
    fn test_query_defaults_and_clamping() {
        let query: UserQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page(), (1, 10));

        let query: UserQuery =
            serde_json::from_str(r#"{"pageNum": -4, "pageSize": 1000, "keyword": "  "}"#).unwrap();
        assert_eq!(query.page(), (1, 100));
        assert_eq!(query.keyword(), None);
    }

    #[test]
    fn test_page_result_total_pages() {
        let page = PageResult::new(vec![1, 2, 3], 21, 1, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(PageResult::<i32>::new(vec![], 0, 1, 10).total_pages, 0);
    }

    #[test]
    fn test_user_response_has_no_password() {
        let now = Utc::now();
        let user = User {
            id: 1,
            username: None,
            account: "zixi_01".into(),
            avatar_url: None,
            gender: None,
            password: "$argon2id$secret".into(),
            phone: None,
            email: None,
            status: STATUS_NORMAL,
            role: Role::User,
            deleted: false,
            create_time: now,
            update_time: now,
        };
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("deleted").is_none());
        assert_eq!(json["role"], "USER");
        assert_eq!(json["account"], "zixi_01");
    }
}
