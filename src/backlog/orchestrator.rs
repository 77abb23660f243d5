use futures::stream::{self, StreamExt};
use tracing::Instrument;

use crate::config::{AppConfig, ChannelConfig, ConfigError};
use crate::telemetry;
use crate::telemetry::ops::process::Phase as ProcessPhase;
use crate::util::time::Clock;
use crate::youtube::VideoApi;

use super::executor::TransitionExecutor;
use super::filter;
use super::quota::QuotaLedger;
use super::report::{ChannelReport, RunReport};
use super::source::{ChannelListing, Discovery};

/// Per-run switches coming from the command line.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub max_videos_override: Option<usize>,
    /// Restrict the run to these channel ids; empty means every enabled one.
    pub only_channels: Vec<String>,
}

/// Drives one run over the configured channels against a single ledger.
pub struct Orchestrator<'a> {
    cfg: &'a AppConfig,
    api: &'a dyn VideoApi,
    clock: &'a dyn Clock,
}

impl<'a> Orchestrator<'a> {
    pub fn new(cfg: &'a AppConfig, api: &'a dyn VideoApi, clock: &'a dyn Clock) -> Self {
        Self { cfg, api, clock }
    }

    /// Only configuration problems abort the run; everything else lands in
    /// the report.
    pub async fn run_once(&self, opts: &RunOptions) -> Result<RunReport, ConfigError> {
        let channels = self.cfg.select_channels(&opts.only_channels)?;
        let ledger = QuotaLedger::new(self.cfg.quota.daily_budget);
        let limit = self.cfg.processing.concurrency.max(1);

        // buffered keeps configured order in the report. With a limit of 1
        // channels run strictly in turn, so earlier channels are served from
        // the budget first; larger limits interleave their reservations.
        let reports: Vec<ChannelReport> = stream::iter(channels)
            .map(|ch| self.process_channel(ch, &ledger, opts))
            .buffered(limit)
            .collect()
            .await;

        let log = telemetry::process();
        let _s = log.span(&ProcessPhase::Finalize).entered();
        Ok(RunReport::finalize(
            opts.dry_run,
            self.cfg.processing.target_visibility,
            reports,
            ledger.budget(),
            ledger.spent(),
        ))
    }

    async fn process_channel(&self, ch: &ChannelConfig, ledger: &QuotaLedger, opts: &RunOptions) -> ChannelReport {
        let log = telemetry::process();
        let span = log.span_kv(&ProcessPhase::Channel, [
            ("channel_id", ch.channel_id.clone()),
            ("name", ch.name.clone()),
        ]);
        let report = self.drive_channel(ch, ledger, opts).instrument(span).await;
        log.channel_summary(&report);
        report
    }

    async fn drive_channel(&self, ch: &ChannelConfig, ledger: &QuotaLedger, opts: &RunOptions) -> ChannelReport {
        let log = telemetry::process();
        let settings = ch.effective(&self.cfg.processing, opts.max_videos_override);
        let target = self.cfg.processing.target_visibility;
        let costs = self.cfg.quota.costs;
        let retry = self.cfg.retry.policy();
        let timeout = self.cfg.api.request_timeout();
        let now = self.clock.now();

        let mut report = ChannelReport::new(&ch.channel_id, &ch.name);
        let executor = TransitionExecutor::new(self.api, ledger, costs, retry, timeout);
        let mut listing =
            ChannelListing::new(self.api, ledger, costs, retry, timeout, &ch.channel_id, settings.max_videos);

        loop {
            match listing.next().await {
                Ok(Some(Discovery::Video(video))) => {
                    report.found += 1;
                    let verdict = {
                        let _s = log.span(&ProcessPhase::Filter).entered();
                        filter::evaluate(&video, now, settings.age_threshold, target)
                    };
                    if !verdict.eligible {
                        log.debug_kv(
                            &format!("↩️ skip {} ({})", video.id, verdict.reason.code()),
                            [("video_id", video.id.clone()), ("reason", verdict.reason.code().to_string())],
                        );
                        report.record_ineligible(verdict.reason);
                        continue;
                    }
                    report.eligible += 1;
                    let outcome = executor.apply(&video, target, opts.dry_run).await;
                    report.record_outcome(outcome);
                }
                Ok(Some(Discovery::QuotaDeferred { unexamined })) => {
                    log.warn_kv(
                        &format!("⏸️ {} deferred: quota exhausted with up to {} videos unexamined", ch.channel_id, unexamined),
                        [
                            ("channel_id", ch.channel_id.clone()),
                            ("unexamined", unexamined.to_string()),
                            ("remaining", ledger.remaining().to_string()),
                        ],
                    );
                    report.quota_deferred = true;
                    report.unexamined = unexamined;
                }
                Ok(None) => break,
                Err(err) => {
                    report.error = Some(err.to_string());
                    break;
                }
            }
        }
        log.debug_kv(
            &format!("📄 {} listing done after {} page(s)", ch.channel_id, listing.pages_fetched()),
            [("channel_id", ch.channel_id.clone()), ("pages", listing.pages_fetched().to_string())],
        );
        report
    }
}
