//! Shared test infrastructure for the workspace crates.
//!
//! - `TestDatabase`: migrated PostgreSQL container (feature: "postgres", default)
//! - `TestRedis`: Redis container (feature: "redis")
//! - `TestDataBuilder`: deterministic accounts, phones and emails
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["redis"] }
//! ```

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Deterministic test data derived from a seed, so parallel tests sharing a
/// database do not collide on unique columns.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seeds from the test name.
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_register");
    /// assert_eq!(builder.account("a"), builder.account("a"));
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// An account name matching `[A-Za-z0-9_]{6,20}`.
    pub fn account(&self, suffix: &str) -> String {
        let mut account = format!("t{:08x}_{}", self.seed as u32, suffix);
        account.truncate(20);
        account
    }

    /// A mainland mobile number (`1[3-9]` followed by 9 digits).
    pub fn phone(&self, index: u32) -> String {
        let tail = (self.seed.wrapping_add(index as u64)) % 1_000_000_000;
        format!("13{tail:09}")
    }

    pub fn email(&self, suffix: &str) -> String {
        format!("test-{}-{}@example.com", self.seed, suffix)
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Unwraps an `Option` with a readable panic message.
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
