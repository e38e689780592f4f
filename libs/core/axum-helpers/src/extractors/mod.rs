//! Extractors that reject with the standard [`ApiError`](crate::errors::ApiError) envelope.

pub mod client;
pub mod id_path;
pub mod validated_json;

pub use client::ClientContext;
pub use id_path::IdPath;
pub use validated_json::ValidatedJson;
