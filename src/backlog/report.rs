use std::collections::BTreeMap;

use serde::Serialize;

use super::types::{EligibilityReason, TransitionOutcome, TransitionStatus, Visibility};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Success,
    PartialFailure,
    HardFailure,
}

impl RunStatus {
    pub fn code(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::PartialFailure => "partial-failure",
            RunStatus::HardFailure => "hard-failure",
        }
    }
}

/// One channel's section of the run report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelReport {
    pub channel_id: String,
    pub name: String,
    pub found: usize,
    pub eligible: usize,
    pub applied: usize,
    pub failed: usize,
    pub skipped_dry_run: usize,
    pub deferred: usize,
    pub ineligible: BTreeMap<EligibilityReason, usize>,
    /// Set when the budget ran out before the listing was exhausted.
    pub quota_deferred: bool,
    /// Upper bound on videos left unlisted because of the budget.
    pub unexamined: usize,
    /// Channel-level failure; outcomes gathered before it are kept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub outcomes: Vec<TransitionOutcome>,
}

impl ChannelReport {
    pub fn new(channel_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            name: name.into(),
            found: 0,
            eligible: 0,
            applied: 0,
            failed: 0,
            skipped_dry_run: 0,
            deferred: 0,
            ineligible: BTreeMap::new(),
            quota_deferred: false,
            unexamined: 0,
            error: None,
            outcomes: Vec::new(),
        }
    }

    pub fn record_ineligible(&mut self, reason: EligibilityReason) {
        *self.ineligible.entry(reason).or_default() += 1;
    }

    pub fn record_outcome(&mut self, outcome: TransitionOutcome) {
        match outcome.status {
            TransitionStatus::Applied => self.applied += 1,
            TransitionStatus::Failed => self.failed += 1,
            TransitionStatus::SkippedDryRun => self.skipped_dry_run += 1,
            TransitionStatus::DeferredQuota => self.deferred += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn has_failure(&self) -> bool {
        self.error.is_some() || self.failed > 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunTotals {
    pub found: usize,
    pub eligible: usize,
    pub applied: usize,
    pub failed: usize,
    pub skipped_dry_run: usize,
    pub deferred: usize,
    pub channel_errors: usize,
}

/// Aggregate of one run. Holds no wall-clock data, so identical remote state
/// gives identical reports.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub target: Visibility,
    pub quota_budget: u64,
    pub quota_spent: u64,
    pub status: RunStatus,
    pub totals: RunTotals,
    pub channels: Vec<ChannelReport>,
}

impl RunReport {
    pub fn finalize(
        dry_run: bool,
        target: Visibility,
        channels: Vec<ChannelReport>,
        quota_budget: u64,
        quota_spent: u64,
    ) -> Self {
        let totals = RunTotals {
            found: channels.iter().map(|c| c.found).sum(),
            eligible: channels.iter().map(|c| c.eligible).sum(),
            applied: channels.iter().map(|c| c.applied).sum(),
            failed: channels.iter().map(|c| c.failed).sum(),
            skipped_dry_run: channels.iter().map(|c| c.skipped_dry_run).sum(),
            deferred: channels.iter().map(|c| c.deferred).sum(),
            channel_errors: channels.iter().filter(|c| c.error.is_some()).count(),
        };
        let status = if !channels.is_empty() && totals.channel_errors == channels.len() {
            RunStatus::HardFailure
        } else if channels.iter().any(ChannelReport::has_failure) {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        };
        Self { dry_run, target, quota_budget, quota_spent, status, totals, channels }
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &TransitionOutcome> {
        self.channels.iter().flat_map(|c| c.outcomes.iter())
    }

    /// 0 only when no channel failed and no outcome is `failed`.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Success => 0,
            _ => 1,
        }
    }
}
