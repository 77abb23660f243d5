use std::time::Duration;

use tracing::Instrument;

use crate::telemetry;
use crate::telemetry::ops::process::Phase as ProcessPhase;
use crate::youtube::{ApiError, VideoApi};

use super::quota::{QuotaCosts, QuotaLedger};
use super::retry::{metered, Metered, RetryPolicy};
use super::types::{TransitionOutcome, TransitionStatus, Visibility, VideoRecord};

/// Moves one eligible video to the target visibility.
///
/// Each attempt reserves the update cost before it is sent. Transient
/// failures retry with backoff up to the policy's attempt limit; a refused
/// reservation ends the attempt as deferred-quota without touching the
/// video. Never panics or returns an error: every path ends in an outcome.
pub struct TransitionExecutor<'a> {
    api: &'a dyn VideoApi,
    ledger: &'a QuotaLedger,
    costs: QuotaCosts,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl<'a> TransitionExecutor<'a> {
    pub fn new(
        api: &'a dyn VideoApi,
        ledger: &'a QuotaLedger,
        costs: QuotaCosts,
        retry: RetryPolicy,
        request_timeout: Duration,
    ) -> Self {
        Self { api, ledger, costs, retry, request_timeout }
    }

    pub async fn apply(&self, video: &VideoRecord, target: Visibility, dry_run: bool) -> TransitionOutcome {
        if dry_run {
            return TransitionOutcome::new(video, target, TransitionStatus::SkippedDryRun);
        }

        let log = telemetry::process();
        let span = log.span_kv(&ProcessPhase::Transition, [
            ("video_id", video.id.clone()),
            ("target", target.to_string()),
        ]);
        let api = self.api;
        let video_id = video.id.as_str();
        let res = metered(self.ledger, self.costs.update, self.retry, self.request_timeout, "update", || {
            api.update_visibility(video_id, target)
        })
        .instrument(span)
        .await;

        let mut outcome = TransitionOutcome::new(video, target, TransitionStatus::Failed);
        match res {
            Metered::Done { attempts, .. } => {
                outcome.status = TransitionStatus::Applied;
                outcome.observed = Some(target);
                outcome.attempts = attempts;
            }
            Metered::Deferred { attempts, last_error } => {
                outcome.status = TransitionStatus::DeferredQuota;
                outcome.attempts = attempts;
                outcome.last_error = last_error.map(|e| e.to_string());
            }
            Metered::Failed { error: ApiError::Conflict(reason), attempts } => {
                outcome.attempts = attempts;
                outcome.last_error = Some(ApiError::Conflict(reason).to_string());
                // someone else may already have moved it
                if let Some(observed) = self.observe(video_id).await {
                    outcome.observed = Some(observed);
                    if observed == target {
                        outcome.status = TransitionStatus::Applied;
                    }
                }
            }
            Metered::Failed { error, attempts } => {
                outcome.attempts = attempts;
                outcome.last_error = Some(error.to_string());
            }
        }

        let kv = [
            ("video_id", video.id.clone()),
            ("status", outcome.status.code().to_string()),
            ("attempts", outcome.attempts.to_string()),
        ];
        match outcome.status {
            TransitionStatus::Applied => log.info_kv(&format!("🔒 {} → {}", video.id, target), kv),
            TransitionStatus::DeferredQuota => {
                log.warn_kv(&format!("⏸️ {} deferred: quota budget exhausted", video.id), kv)
            }
            _ => log.warn_kv(
                &format!(
                    "❌ {} failed after {} attempt(s): {}",
                    video.id,
                    outcome.attempts,
                    outcome.last_error.as_deref().unwrap_or("unknown error")
                ),
                kv,
            ),
        }
        outcome
    }

    /// Single fresh read of the current visibility, under the ledger and
    /// without retries.
    async fn observe(&self, video_id: &str) -> Option<Visibility> {
        let once = RetryPolicy { max_attempts: 1, ..self.retry };
        let ids = [video_id.to_string()];
        let api = self.api;
        match metered(self.ledger, self.costs.details, once, self.request_timeout, "details", || {
            api.video_details(&ids)
        })
        .await
        {
            Metered::Done { value, .. } => value.into_iter().find(|d| d.id == video_id).map(|d| d.visibility),
            _ => None,
        }
    }
}
