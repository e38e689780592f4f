//! Users Domain
//!
//! Account registration with SMS/email verification codes, login sessions,
//! profile self-service and administrator user management.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← /users and /admin endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Business rules, password hashing, code issuance
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌─────────────┐
//! │ Repository  │     │   Notify    │  ← SMS gateway / SMTP delivery
//! └──────┬──────┘     └─────────────┘
//!        │
//! ┌──────▼──────┐
//! │   Entity    │  ← SeaORM models for users, codes, login history
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum_helpers::{InMemorySessionStore, JwtConfig, JwtRedisAuth};
//! use domain_users::{
//!     clock::SystemClock,
//!     handlers::{self, UsersState},
//!     notify::CodeSenders,
//!     repository::{
//!         InMemoryLoginHistoryRepository, InMemoryUserRepository,
//!         InMemoryVerificationCodeRepository,
//!     },
//!     service::{AdminService, UserService, VerificationService},
//! };
//!
//! let users = Arc::new(InMemoryUserRepository::new());
//! let history = Arc::new(InMemoryLoginHistoryRepository::new());
//! let clock = Arc::new(SystemClock);
//! let verification = VerificationService::new(
//!     Arc::new(InMemoryVerificationCodeRepository::new()),
//!     CodeSenders::disabled(),
//!     clock.clone(),
//! );
//!
//! let state = UsersState {
//!     users: UserService::new(users.clone(), history.clone(), verification, clock),
//!     admin: AdminService::new(users, history),
//!     auth: JwtRedisAuth::with_store(
//!         Arc::new(InMemorySessionStore::new()),
//!         &JwtConfig::new("a-development-secret-of-at-least-32-chars").unwrap(),
//!     ),
//!     secure_cookies: false,
//! };
//! let router = handlers::router(state);
//! ```

pub mod clock;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod password;
pub mod repository;
pub mod service;

pub use error::{UserError, UserResult};
pub use handlers::UsersState;
pub use models::{
    CodePurpose, LoginHistory, LoginRequest, PageResult, RegisterRequest, Role, TargetType, User,
    UserResponse,
};
pub use repository::{LoginHistoryRepository, UserRepository, VerificationCodeRepository};
pub use service::{AdminService, UserService, VerificationService};
