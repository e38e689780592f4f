//! Business rules, one service per audience.

mod account;
mod admin;
mod verification;

pub use account::UserService;
pub use admin::AdminService;
pub use verification::{VerificationService, generate_code};
