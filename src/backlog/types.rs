use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
    Unknown,
}

impl Visibility {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
            Visibility::Unknown => "unknown",
        }
    }

    /// Maps a remote `privacyStatus`; anything unrecognised is `Unknown`.
    pub fn from_api_str(s: &str) -> Self {
        match s {
            "public" => Visibility::Public,
            "unlisted" => Visibility::Unlisted,
            "private" => Visibility::Private,
            _ => Visibility::Unknown,
        }
    }

    /// Only restricted states are valid transition targets.
    pub fn is_restricted(&self) -> bool {
        matches!(self, Visibility::Unlisted | Visibility::Private)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility: {other}")),
        }
    }
}

/// One discovered video as observed at listing time. Never mutated; a
/// transition yields a `TransitionOutcome` instead.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoRecord {
    pub id: String,
    pub channel_id: String,
    pub title: Option<String>,
    pub visibility: Visibility,
    pub published_at: DateTime<Utc>,
    pub is_live: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EligibilityReason {
    NotLive,
    AlreadyTargetVisibility,
    TooYoung,
    Eligible,
}

impl EligibilityReason {
    pub fn code(&self) -> &'static str {
        match self {
            EligibilityReason::NotLive => "not-live",
            EligibilityReason::AlreadyTargetVisibility => "already-target-visibility",
            EligibilityReason::TooYoung => "too-young",
            EligibilityReason::Eligible => "eligible",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EligibilityVerdict {
    pub eligible: bool,
    pub reason: EligibilityReason,
}

impl EligibilityVerdict {
    pub fn eligible() -> Self {
        Self { eligible: true, reason: EligibilityReason::Eligible }
    }

    pub fn ineligible(reason: EligibilityReason) -> Self {
        Self { eligible: false, reason }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionStatus {
    Applied,
    SkippedDryRun,
    Failed,
    DeferredQuota,
}

impl TransitionStatus {
    pub fn code(&self) -> &'static str {
        match self {
            TransitionStatus::Applied => "applied",
            TransitionStatus::SkippedDryRun => "skipped-dry-run",
            TransitionStatus::Failed => "failed",
            TransitionStatus::DeferredQuota => "deferred-quota",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub video_id: String,
    pub previous: Visibility,
    pub target: Visibility,
    /// Visibility last seen on the remote, after an update or a conflict re-read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<Visibility>,
    pub status: TransitionStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl TransitionOutcome {
    pub(crate) fn new(video: &VideoRecord, target: Visibility, status: TransitionStatus) -> Self {
        Self {
            video_id: video.id.clone(),
            previous: video.visibility,
            target,
            observed: None,
            status,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == TransitionStatus::Failed
    }
}
