use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod env;
pub mod types;
pub mod validate;

pub use types::{AppConfig, ChannelConfig};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yml";

/// Problems that stop a run before any channel is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration syntax: {0}")]
    Parse(String),
    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
    #[error("missing credentials: set api.access_token (for example to ${{YOUTUBE_ACCESS_TOKEN}})")]
    MissingCredentials,
    #[error("unknown channel: {0} is not in the configuration")]
    UnknownChannel(String),
}

/// Reads, expands and validates the YAML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    let cfg = read(path)?;
    let problems = validate::validate(&cfg);
    if !problems.is_empty() {
        return Err(ConfigError::Invalid(problems));
    }
    Ok(cfg)
}

/// Reads and expands the YAML file at `path` without validating it.
pub fn read(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
        _ => ConfigError::Read { path: path.to_path_buf(), source: e },
    })?;
    parse(&raw, &|name| std::env::var(name).ok())
}

/// Parses YAML text after placeholder expansion. Does not validate.
pub fn parse<F>(raw: &str, lookup: &F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value: serde_yaml::Value = serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
    if value.is_null() {
        return Err(ConfigError::Parse("configuration file is empty".to_string()));
    }
    let value = env::substitute(value, lookup);
    serde_yaml::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
}

impl AppConfig {
    /// Enabled channels in configured order, narrowed to `only` when it is
    /// non-empty. Each id in `only` must name a configured channel.
    pub fn select_channels(&self, only: &[String]) -> Result<Vec<&ChannelConfig>, ConfigError> {
        if let Some(missing) = only.iter().find(|id| !self.channels.iter().any(|c| &c.channel_id == *id)) {
            return Err(ConfigError::UnknownChannel(missing.clone()));
        }
        Ok(self
            .channels
            .iter()
            .filter(|c| c.enabled)
            .filter(|c| only.is_empty() || only.contains(&c.channel_id))
            .collect())
    }

    pub fn access_token(&self) -> Result<&str, ConfigError> {
        match self.api.access_token.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(ConfigError::MissingCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlog::types::Visibility;
    use std::io::Write;

    const SAMPLE: &str = r#"
channels:
  - name: Main
    channel_id: UCaaaaaaaaaaaaaaaaaaaaaa
  - name: Second
    channel_id: UCbbbbbbbbbbbbbbbbbbbbbb
    enabled: false
  - name: Third
    channel_id: UCcccccccccccccccccccccc
    max_videos: 5
    age_threshold_hours: 72
processing:
  target_visibility: private
  dry_run: ${ARCHIVER_TEST_DRY:true}
api:
  access_token: ${ARCHIVER_TEST_TOKEN}
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parses_with_defaults_and_placeholders() {
        let cfg = parse(SAMPLE, &|name| (name == "ARCHIVER_TEST_TOKEN").then(|| "tok".to_string())).unwrap();
        assert_eq!(cfg.channels.len(), 3);
        assert!(cfg.channels[0].enabled);
        assert_eq!(cfg.processing.target_visibility, Visibility::Private);
        assert!(cfg.processing.dry_run);
        assert_eq!(cfg.processing.age_threshold_hours, 24);
        assert_eq!(cfg.quota.daily_budget, 10_000);
        assert_eq!(cfg.quota.costs.update, 50);
        assert_eq!(cfg.access_token().unwrap(), "tok");
    }

    #[test]
    fn empty_token_is_missing_credentials() {
        let cfg = parse(SAMPLE, &no_env).unwrap();
        assert!(matches!(cfg.access_token(), Err(ConfigError::MissingCredentials)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse("channels: []\nprocesing:\n  dry_run: true\n", &no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn numeric_expansions_fill_string_fields() {
        let raw = "channels:\n  - name: ${CH_NAME}\n    channel_id: UCaaaaaaaaaaaaaaaaaaaaaa\napi:\n  access_token: ${TOKEN}\n";
        let lookup = |name: &str| match name {
            "CH_NAME" => Some("2024".to_string()),
            "TOKEN" => Some("123456".to_string()),
            _ => None,
        };
        let cfg = parse(raw, &lookup).unwrap();
        assert_eq!(cfg.channels[0].name, "2024");
        assert_eq!(cfg.access_token().unwrap(), "123456");
        assert!(validate::validate(&cfg).is_empty());
    }

    #[test]
    fn empty_file_is_a_parse_error() {
        assert!(matches!(parse("", &no_env), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn selection_keeps_order_and_skips_disabled() {
        let cfg = parse(SAMPLE, &no_env).unwrap();
        let ids: Vec<&str> = cfg.select_channels(&[]).unwrap().iter().map(|c| c.channel_id.as_str()).collect();
        assert_eq!(ids, vec!["UCaaaaaaaaaaaaaaaaaaaaaa", "UCcccccccccccccccccccccc"]);

        let only = vec!["UCcccccccccccccccccccccc".to_string()];
        assert_eq!(cfg.select_channels(&only).unwrap().len(), 1);

        let unknown = vec!["UCzzzzzzzzzzzzzzzzzzzzzz".to_string()];
        assert!(matches!(cfg.select_channels(&unknown), Err(ConfigError::UnknownChannel(_))));
    }

    #[test]
    fn effective_settings_resolve_overrides() {
        let cfg = parse(SAMPLE, &no_env).unwrap();
        let third = &cfg.channels[2];
        let eff = third.effective(&cfg.processing, None);
        assert_eq!(eff.max_videos, 5);
        assert_eq!(eff.age_threshold, chrono::Duration::hours(72));
        assert_eq!(third.effective(&cfg.processing, Some(9)).max_videos, 9);
        assert_eq!(cfg.channels[0].effective(&cfg.processing, None).max_videos, 50);
    }

    #[test]
    fn load_reports_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yml");
        assert!(matches!(load(&missing), Err(ConfigError::NotFound(_))));

        let path = dir.path().join("config.yml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "channels:\n  - name: Bad\n    channel_id: nope").unwrap();
        match load(&path) {
            Err(ConfigError::Invalid(problems)) => assert_eq!(problems.len(), 2),
            other => panic!("expected invalid config, got {other:?}"),
        }
    }
}
