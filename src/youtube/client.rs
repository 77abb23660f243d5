use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::backlog::types::Visibility;

use super::{ApiError, ListedVideo, VideoApi, VideoDetails, VideoPage, MAX_IDS_PER_DETAILS_CALL, MAX_PAGE_SIZE};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct YouTubeClientConfig {
    pub base_url: String,
    pub access_token: String,
    pub timeout: Duration,
}

impl Default for YouTubeClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Clone)]
pub struct YouTubeClient {
    http: HttpClient,
    cfg: YouTubeClientConfig,
}

impl YouTubeClient {
    pub fn new(cfg: YouTubeClientConfig) -> Result<Self, ApiError> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(ApiError::from_reqwest)?;
        Ok(Self { http, cfg })
    }

    fn endpoint(&self, resource: &str) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), resource);
        Url::parse(&raw).map_err(|e| ApiError::BadRequest(format!("invalid endpoint {raw}: {e}")))
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(&self, response: Response, resource: &str) -> Result<T, ApiError> {
        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let bytes = response.bytes().await.map_err(ApiError::from_reqwest)?;
        if !status.is_success() {
            return Err(classify(status, &bytes, retry_after, resource));
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// `UC…` channel ids own an uploads playlist `UU…` with the same suffix.
pub fn uploads_playlist_id(channel_id: &str) -> String {
    match channel_id.strip_prefix("UC") {
        Some(rest) => format!("UU{rest}"),
        None => channel_id.to_string(),
    }
}

#[async_trait]
impl VideoApi for YouTubeClient {
    async fn list_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<VideoPage, ApiError> {
        let mut url = self.endpoint("playlistItems")?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("part", "snippet,contentDetails");
            q.append_pair("playlistId", &uploads_playlist_id(channel_id));
            q.append_pair("maxResults", &page_size.clamp(1, MAX_PAGE_SIZE).to_string());
            if let Some(token) = page_token {
                q.append_pair("pageToken", token);
            }
        }

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.cfg.access_token)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        let parsed: ApiPlaylistItemList = self.read_json(response, channel_id).await?;
        Ok(parsed.into_page())
    }

    async fn video_details(&self, ids: &[String]) -> Result<Vec<VideoDetails>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_IDS_PER_DETAILS_CALL {
            return Err(ApiError::BadRequest(format!(
                "{} ids exceeds the per-call limit of {}",
                ids.len(),
                MAX_IDS_PER_DETAILS_CALL
            )));
        }

        let mut url = self.endpoint("videos")?;
        url.query_pairs_mut()
            .append_pair("part", "snippet,status,liveStreamingDetails")
            .append_pair("id", &ids.join(","))
            .append_pair("maxResults", &MAX_IDS_PER_DETAILS_CALL.to_string());

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.cfg.access_token)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        let parsed: ApiVideoList = self.read_json(response, "videos").await?;

        Ok(parsed.items.into_iter().filter_map(ApiVideo::into_details).collect())
    }

    async fn update_visibility(&self, video_id: &str, visibility: Visibility) -> Result<(), ApiError> {
        if !visibility.is_restricted() && visibility != Visibility::Public {
            return Err(ApiError::BadRequest(format!("cannot set visibility {visibility}")));
        }
        let mut url = self.endpoint("videos")?;
        url.query_pairs_mut().append_pair("part", "status");

        let body = json!({
            "id": video_id,
            "status": { "privacyStatus": visibility.as_api_str() }
        });
        let response = self
            .http
            .put(url)
            .bearer_auth(&self.cfg.access_token)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        let updated: ApiVideo = self.read_json(response, video_id).await?;
        updated.confirm_update(video_id)
    }
}

impl ApiError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if let Some(status) = err.status() {
            ApiError::Server { status: status.as_u16() }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Only the delay-seconds form is honoured; an HTTP date is ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn classify(status: StatusCode, body: &[u8], retry_after: Option<Duration>, resource: &str) -> ApiError {
    let envelope = serde_json::from_slice::<ApiErrorEnvelope>(body).ok().map(|e| e.error);
    let message = envelope
        .as_ref()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| status.to_string());
    let reasons: Vec<String> = envelope
        .map(|e| e.errors.into_iter().filter_map(|d| d.reason).collect())
        .unwrap_or_default();
    let has_reason = |needles: &[&str]| reasons.iter().any(|r| needles.contains(&r.as_str()));

    match status.as_u16() {
        404 => ApiError::NotFound(resource.to_string()),
        401 => ApiError::Unauthorized(message),
        403 if has_reason(&["quotaExceeded", "dailyLimitExceeded"]) => ApiError::QuotaExceeded,
        403 if has_reason(&["rateLimitExceeded", "userRateLimitExceeded"]) => ApiError::RateLimited { retry_after },
        403 => ApiError::Forbidden(message),
        409 => ApiError::Conflict(message),
        429 => ApiError::RateLimited { retry_after },
        400 => ApiError::BadRequest(message),
        s if s >= 500 => ApiError::Server { status: s },
        s => ApiError::BadRequest(format!("HTTP {s}: {message}")),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlaylistItemList {
    #[serde(default)]
    items: Vec<ApiPlaylistItem>,
    next_page_token: Option<String>,
}

impl ApiPlaylistItemList {
    /// The playlist's own `videoPublishedAt` is preferred; the snippet date
    /// is when the item was added to the playlist.
    fn into_page(self) -> VideoPage {
        let videos = self
            .items
            .into_iter()
            .map(|item| ListedVideo {
                id: item.snippet.resource_id.video_id,
                published_at: item
                    .content_details
                    .and_then(|c| c.video_published_at)
                    .unwrap_or(item.snippet.published_at),
            })
            .collect();
        VideoPage { videos, next_page_token: self.next_page_token }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlaylistItem {
    snippet: ApiPlaylistSnippet,
    content_details: Option<ApiPlaylistContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlaylistSnippet {
    published_at: DateTime<Utc>,
    resource_id: ApiResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResourceId {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlaylistContentDetails {
    video_published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiVideoList {
    #[serde(default)]
    items: Vec<ApiVideo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVideo {
    id: String,
    snippet: Option<ApiVideoSnippet>,
    status: Option<ApiVideoStatus>,
    live_streaming_details: Option<ApiLiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVideoSnippet {
    title: Option<String>,
    published_at: DateTime<Utc>,
    live_broadcast_content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVideoStatus {
    privacy_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiLiveStreamingDetails {
    actual_start_time: Option<DateTime<Utc>>,
    scheduled_start_time: Option<DateTime<Utc>>,
}

impl ApiVideo {
    fn confirm_update(&self, video_id: &str) -> Result<(), ApiError> {
        if self.id != video_id {
            return Err(ApiError::Decode(format!("update response returned id {}", self.id)));
        }
        Ok(())
    }

    fn into_details(self) -> Option<VideoDetails> {
        let snippet = self.snippet?;
        let visibility = self
            .status
            .and_then(|s| s.privacy_status)
            .map(|s| Visibility::from_api_str(&s))
            .unwrap_or(Visibility::Unknown);
        let live_now = matches!(snippet.live_broadcast_content.as_deref(), Some("live" | "upcoming"));
        // broadcast start is the age reference for streams
        let (is_live, published_at) = match self.live_streaming_details {
            Some(d) => (true, d.actual_start_time.or(d.scheduled_start_time).unwrap_or(snippet.published_at)),
            None => (live_now, snippet.published_at),
        };
        Some(VideoDetails { id: self.id, title: snippet.title, visibility, published_at, is_live })
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    reason: Option<String>,
}
