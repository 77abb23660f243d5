use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::backlog::quota::QuotaCosts;
use crate::backlog::retry::RetryPolicy;
use crate::backlog::types::Visibility;
use crate::youtube::client::DEFAULT_BASE_URL;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Configured unit of work. Overrides are resolved once when the channel
/// starts processing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub channel_id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub max_videos: Option<usize>,
    #[serde(default)]
    pub age_threshold_hours: Option<u32>,
}

/// Per-channel values in force for one run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectiveSettings {
    pub max_videos: usize,
    pub age_threshold: chrono::Duration,
}

impl ChannelConfig {
    /// CLI override wins over the channel's own cap, which wins over the
    /// processing default.
    pub fn effective(&self, processing: &ProcessingConfig, max_videos_override: Option<usize>) -> EffectiveSettings {
        let max_videos = max_videos_override
            .or(self.max_videos)
            .unwrap_or(processing.max_videos_per_channel);
        let hours = self.age_threshold_hours.unwrap_or(processing.age_threshold_hours);
        EffectiveSettings { max_videos, age_threshold: chrono::Duration::hours(i64::from(hours)) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProcessingConfig {
    pub age_threshold_hours: u32,
    pub target_visibility: Visibility,
    pub max_videos_per_channel: usize,
    pub dry_run: bool,
    pub concurrency: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            age_threshold_hours: 24,
            target_visibility: Visibility::Unlisted,
            max_videos_per_channel: 50,
            dry_run: false,
            concurrency: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct QuotaConfig {
    pub daily_budget: u64,
    pub costs: QuotaCosts,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self { daily_budget: 10_000, costs: QuotaCosts::default() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 1_000, backoff_factor: 2.0, max_delay_secs: 300 }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            backoff_factor: self.backoff_factor,
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ApiConfig {
    #[serde(deserialize_with = "scalar_string")]
    pub base_url: String,
    #[serde(skip_serializing, deserialize_with = "optional_scalar_string")]
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string(), access_token: None, request_timeout_secs: 30 }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_true() -> bool {
    true
}

/// Takes a number or bool as its text, since a `${VAR}` expansion such as
/// `2024` arrives as a YAML number.
fn scalar_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    optional_scalar_string(de)?.ok_or_else(|| D::Error::custom("expected a string, found null"))
}

fn optional_scalar_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(de)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!("expected a string, found {other:?}"))),
    }
}
