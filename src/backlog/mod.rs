use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use uuid::Uuid;

use crate::config;
use crate::output::config::envelopes_enabled;
use crate::output::types::Meta;
use crate::telemetry::{self};
use crate::telemetry::ops::process::Phase as ProcessPhase;
use crate::util::time::SystemClock;
use crate::youtube::{YouTubeClient, YouTubeClientConfig};

pub mod executor;
pub mod filter;
pub mod orchestrator;
pub mod quota;
pub mod report;
pub mod retry;
pub mod source;
pub mod types;

use orchestrator::{Orchestrator, RunOptions};
use report::RunReport;

#[derive(Args)]
pub struct ProcessCmd {
    /// Report what would change without updating any video
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
    /// Only process this configured channel id (repeatable)
    #[arg(long = "channel", value_name = "ID")]
    pub channels: Vec<String>,
    /// Override how many recent videos are checked per channel
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=200))]
    pub max_videos: Option<u16>,
}

/// Runs one archiving pass and returns the process exit code.
pub async fn run(config_path: &Path, args: ProcessCmd) -> Result<i32> {
    let log = telemetry::process();
    let run_id = Uuid::new_v4().to_string();
    let _g = log.root_span_kv([
        ("run_id", run_id.clone()),
        ("dry_run", args.dry_run.to_string()),
        ("channels", format!("{:?}", args.channels)),
        ("max_videos", format!("{:?}", args.max_videos)),
    ]).entered();
    let t0 = Instant::now();

    let cfg = config::load(config_path)?;
    let opts = RunOptions {
        dry_run: args.dry_run || cfg.processing.dry_run,
        max_videos_override: args.max_videos.map(usize::from),
        only_channels: args.channels,
    };

    {
        let _sp = log.span(&ProcessPhase::Plan).entered();
        let selected: Vec<&str> = cfg
            .select_channels(&opts.only_channels)?
            .iter()
            .map(|c| c.channel_id.as_str())
            .collect();
        let mode = if opts.dry_run { "dry-run" } else { "live" };
        log.info_kv(
            &format!(
                "📝 Archive {} — channels={} target={} budget={} concurrency={}",
                mode,
                selected.len(),
                cfg.processing.target_visibility,
                cfg.quota.daily_budget,
                cfg.processing.concurrency
            ),
            [("mode", mode.to_string()), ("channels", selected.join(","))],
        );
    }

    let client = YouTubeClient::new(YouTubeClientConfig {
        base_url: cfg.api.base_url.clone(),
        access_token: cfg.access_token()?.to_string(),
        timeout: cfg.api.request_timeout(),
    })?;
    let clock = SystemClock;
    let report = Orchestrator::new(&cfg, &client, &clock).run_once(&opts).await?;

    log.totals(&report);
    log_failures(&report);

    if envelopes_enabled() {
        let meta = Meta { duration_ms: Some(t0.elapsed().as_millis()), run_id: Some(run_id) };
        if report.dry_run { log.plan(&report, Some(meta))?; } else { log.result(&report, Some(meta))?; }
    }
    if report.dry_run && !telemetry::config::json_mode() {
        log.info("   Dry run: no video was changed. Drop --dry-run to apply.");
    }
    Ok(report.exit_code())
}

fn log_failures(report: &RunReport) {
    let log = telemetry::process();
    for o in report.outcomes().filter(|o| o.is_failure()) {
        log.warn_kv(
            &format!("  ❌ {} {} → {}: {}", o.video_id, o.previous, o.target, o.last_error.as_deref().unwrap_or("unknown error")),
            [("video_id", o.video_id.clone()), ("attempts", o.attempts.to_string())],
        );
    }
}
