use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::Instrument;

use crate::backlog::quota::QuotaLedger;
use crate::backlog::source::{ChannelListing, Discovery};
use crate::config::{self, AppConfig, ConfigError};
use crate::output::config::envelopes_enabled;
use crate::telemetry::{self};
use crate::telemetry::ops::validate::Phase as ValidatePhase;
use crate::youtube::{VideoApi, YouTubeClient, YouTubeClientConfig};

/// Recent videos listed per channel when checking access.
const ACCESS_SAMPLE: usize = 5;

#[derive(Args)]
pub struct ValidateCmd {
    /// Also require an access token, as `process` does
    #[arg(long, default_value_t = false)]
    pub require_credentials: bool,
    /// List a few recent videos of every enabled channel (implies --require-credentials)
    #[arg(long, default_value_t = false)]
    pub check_access: bool,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct ValidationResult {
    pub valid: bool,
    pub channels: usize,
    pub enabled_channels: usize,
    pub problems: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub access: Vec<ChannelAccess>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct ChannelAccess {
    pub channel_id: String,
    pub name: String,
    pub videos: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    fn invalid(problem: String) -> Self {
        Self { valid: false, channels: 0, enabled_channels: 0, problems: vec![problem], access: Vec::new() }
    }

    fn record_access(&mut self, access: Vec<ChannelAccess>) {
        for a in &access {
            if let Some(err) = &a.error {
                self.problems.push(format!("channel {} ({}) is not accessible: {}", a.name, a.channel_id, err));
            }
        }
        self.valid = self.problems.is_empty();
        self.access = access;
    }
}

/// Loads the configuration and reports every problem; exit code 1 when any.
pub async fn run(config_path: &Path, args: ValidateCmd) -> Result<i32> {
    let log = telemetry::validate();
    let _g = log.root_span_kv([
        ("config", config_path.display().to_string()),
        ("require_credentials", args.require_credentials.to_string()),
        ("check_access", args.check_access.to_string()),
    ]).entered();

    let (mut result, cfg) = check(config_path, args.require_credentials || args.check_access)?;

    // remote checks only make sense for a configuration that would run
    if args.check_access {
        if let Some(cfg) = cfg.filter(|_| result.valid) {
            let client = YouTubeClient::new(YouTubeClientConfig {
                base_url: cfg.api.base_url.clone(),
                access_token: cfg.access_token()?.to_string(),
                timeout: cfg.api.request_timeout(),
            })?;
            let access = check_access(&cfg, &client).instrument(log.span(&ValidatePhase::Access)).await;
            result.record_access(access);
        }
    }

    if envelopes_enabled() {
        log.result(&result, None)?;
    }
    if !telemetry::config::json_mode() {
        if result.valid {
            log.info(format!("✅ Configuration valid — channels={} enabled={}", result.channels, result.enabled_channels));
        } else {
            log.error(format!("❌ Configuration invalid — {} problem(s)", result.problems.len()));
            for p in &result.problems { log.error(format!("  - {}", p)); }
        }
    }
    Ok(if result.valid { 0 } else { 1 })
}

/// Syntax and validation problems become part of the result; a missing or
/// unreadable file is an error. The parsed configuration comes back when it
/// could be read at all.
fn check(config_path: &Path, require_credentials: bool) -> Result<(ValidationResult, Option<AppConfig>), ConfigError> {
    let log = telemetry::validate();
    let loaded = {
        let _s = log.span(&ValidatePhase::Load).entered();
        config::read(config_path)
    };
    let cfg = match loaded {
        Ok(cfg) => cfg,
        Err(ConfigError::Parse(msg)) => return Ok((ValidationResult::invalid(msg), None)),
        Err(other) => return Err(other),
    };

    let _s = log.span(&ValidatePhase::Check).entered();
    let mut problems = config::validate::validate(&cfg);
    if require_credentials {
        if let Err(e) = cfg.access_token() {
            problems.push(e.to_string());
        }
    }
    let result = ValidationResult {
        valid: problems.is_empty(),
        channels: cfg.channels.len(),
        enabled_channels: cfg.channels.iter().filter(|c| c.enabled).count(),
        problems,
        access: Vec::new(),
    };
    Ok((result, Some(cfg)))
}

/// Lists a few recent videos of every enabled channel, in configured order,
/// against the configured quota budget.
async fn check_access(cfg: &AppConfig, api: &dyn VideoApi) -> Vec<ChannelAccess> {
    let log = telemetry::validate();
    let ledger = QuotaLedger::new(cfg.quota.daily_budget);
    let mut checked = Vec::new();

    for ch in cfg.channels.iter().filter(|c| c.enabled) {
        let mut listing = ChannelListing::new(
            api,
            &ledger,
            cfg.quota.costs,
            cfg.retry.policy(),
            cfg.api.request_timeout(),
            &ch.channel_id,
            ACCESS_SAMPLE,
        );
        let mut access = ChannelAccess { channel_id: ch.channel_id.clone(), name: ch.name.clone(), videos: 0, error: None };
        loop {
            match listing.next().await {
                Ok(Some(Discovery::Video(_))) => access.videos += 1,
                Ok(Some(Discovery::QuotaDeferred { .. })) => {
                    access.error = Some("quota budget exhausted before the channel was checked".to_string());
                    break;
                }
                Ok(None) => break,
                Err(err) => {
                    access.error = Some(err.to_string());
                    break;
                }
            }
        }
        match &access.error {
            None => log.info(format!("✅ {} ({}): {} videos accessible", ch.name, ch.channel_id, access.videos)),
            Some(err) => log.error(format!("❌ {} ({}): {}", ch.name, ch.channel_id, err)),
        }
        checked.push(access);
    }
    checked
}
