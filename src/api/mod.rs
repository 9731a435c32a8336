//! Backend submission API.
//!
//! Recordings, result lists, ratings, and voice-over comments are
//! posted to the application backend over HTTPS. All endpoints are
//! idempotent at the server, so network failures are retried with a
//! bounded backoff; the session never changes state on a submission
//! outcome — failures after retries are logged and dropped.

pub mod client;

pub use client::QueryApi;

use thiserror::Error;

/// Submission failure taxonomy: the transport failed, or the server
/// answered with a non-success status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server error: {message}")]
    Server { message: String },
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
