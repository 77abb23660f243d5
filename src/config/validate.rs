use std::collections::HashSet;
use std::ops::RangeInclusive;

use url::Url;

use super::types::AppConfig;

const AGE_HOURS: RangeInclusive<u32> = 1..=168;
const MAX_VIDEOS: RangeInclusive<usize> = 1..=200;
const CONCURRENCY: RangeInclusive<usize> = 1..=16;
const ATTEMPTS: RangeInclusive<u32> = 1..=10;
const BACKOFF: RangeInclusive<f64> = 1.0..=10.0;
const CHANNEL_PREFIXES: [&str; 3] = ["UC", "UU", "UL"];
const CHANNEL_ID_LEN: usize = 24;

/// Every problem found in `cfg`; empty when the configuration is usable.
pub fn validate(cfg: &AppConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if cfg.channels.is_empty() {
        errors.push("no channels configured".to_string());
    }
    let mut seen = HashSet::new();
    for (i, ch) in cfg.channels.iter().enumerate() {
        let at = format!("channels[{i}]");
        if ch.name.trim().is_empty() {
            errors.push(format!("{at}: name must not be empty"));
        }
        if !CHANNEL_PREFIXES.iter().any(|p| ch.channel_id.starts_with(p)) {
            errors.push(format!("{at}: invalid channel id format: {:?} (must start with UC, UU or UL)", ch.channel_id));
        }
        if ch.channel_id.len() != CHANNEL_ID_LEN {
            errors.push(format!("{at}: invalid channel id length: {:?} (must be {CHANNEL_ID_LEN})", ch.channel_id));
        }
        if !seen.insert(ch.channel_id.as_str()) {
            errors.push(format!("{at}: duplicate channel id {}", ch.channel_id));
        }
        if let Some(n) = ch.max_videos {
            check(&mut errors, &format!("{at}.max_videos"), n, &MAX_VIDEOS);
        }
        if let Some(h) = ch.age_threshold_hours {
            check(&mut errors, &format!("{at}.age_threshold_hours"), h, &AGE_HOURS);
        }
    }

    let p = &cfg.processing;
    check(&mut errors, "processing.age_threshold_hours", p.age_threshold_hours, &AGE_HOURS);
    check(&mut errors, "processing.max_videos_per_channel", p.max_videos_per_channel, &MAX_VIDEOS);
    check(&mut errors, "processing.concurrency", p.concurrency, &CONCURRENCY);
    if !p.target_visibility.is_restricted() {
        errors.push(format!(
            "processing.target_visibility: invalid target visibility {} (must be unlisted or private)",
            p.target_visibility
        ));
    }

    let r = &cfg.retry;
    check(&mut errors, "retry.max_attempts", r.max_attempts, &ATTEMPTS);
    check(&mut errors, "retry.backoff_factor", r.backoff_factor, &BACKOFF);
    if r.max_delay_secs == 0 {
        errors.push("retry.max_delay_secs: must be at least 1".to_string());
    }
    if r.base_delay_ms > r.max_delay_secs.saturating_mul(1_000) {
        errors.push("retry.base_delay_ms: must not exceed retry.max_delay_secs".to_string());
    }

    if cfg.api.request_timeout_secs == 0 {
        errors.push("api.request_timeout_secs: must be at least 1".to_string());
    }
    if let Err(e) = Url::parse(&cfg.api.base_url) {
        errors.push(format!("api.base_url: {e}"));
    }

    errors
}

fn check<T>(errors: &mut Vec<String>, field: &str, value: T, range: &RangeInclusive<T>)
where
    T: PartialOrd + std::fmt::Display,
{
    if !range.contains(&value) {
        errors.push(format!("{field}: {value} out of range ({}-{})", range.start(), range.end()));
    }
}
