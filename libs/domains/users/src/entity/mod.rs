//! Sea-ORM entities for the `users`, `verification_codes` and `login_history` tables.

pub mod login_history;
pub mod user;
pub mod verification_code;
