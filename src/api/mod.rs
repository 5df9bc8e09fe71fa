//! API client module.
//!
//! Provides the HTTP client with bearer-token injection, timeout handling,
//! per-call request descriptors and the normalized error shape returned to
//! every caller.

pub mod client;
pub mod error;
pub mod request;

pub use client::{ApiClient, TokenFuture};
pub use error::ApiError;
pub use request::{Body, RequestOptions};
