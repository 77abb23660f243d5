use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::backlog::types::Visibility;

pub mod client;
#[cfg(test)]
pub mod mock;

pub use client::{YouTubeClient, YouTubeClientConfig};

/// `videos.list` accepts at most this many ids per call.
pub const MAX_IDS_PER_DETAILS_CALL: usize = 50;
/// `playlistItems.list` page size ceiling.
pub const MAX_PAGE_SIZE: usize = 50;

/// One entry of a channel's upload listing, before details are resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct ListedVideo {
    pub id: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VideoPage {
    pub videos: Vec<ListedVideo>,
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VideoDetails {
    pub id: String,
    pub title: Option<String>,
    pub visibility: Visibility,
    pub published_at: DateTime<Utc>,
    pub is_live: bool,
}

/// Narrow contract the backlog pipeline needs from the remote video service.
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// One page of a channel's uploads, most recent first.
    async fn list_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<VideoPage, ApiError>;

    /// Details for up to `MAX_IDS_PER_DETAILS_CALL` ids. Ids the remote does
    /// not return are simply absent from the result.
    async fn video_details(&self, ids: &[String]) -> Result<Vec<VideoDetails>, ApiError>;

    async fn update_visibility(&self, video_id: &str, visibility: Visibility) -> Result<(), ApiError>;
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("rate limited by remote")]
    RateLimited { retry_after: Option<Duration> },
    #[error("remote daily quota exceeded")]
    QuotaExceeded,
    #[error("server error (HTTP {status})")]
    Server { status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Transient classes worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimited { .. }
            | ApiError::Server { .. }
            | ApiError::Network(_)
            | ApiError::Timeout => true,
            ApiError::QuotaExceeded
            | ApiError::NotFound(_)
            | ApiError::Forbidden(_)
            | ApiError::Conflict(_)
            | ApiError::BadRequest(_)
            | ApiError::Unauthorized(_)
            | ApiError::Decode(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Bounds a remote call so no single request can block a worker forever.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(res) => res,
        Err(_) => Err(ApiError::Timeout),
    }
}
