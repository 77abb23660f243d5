use std::env;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl OutputConfig {
    pub fn from_env() -> Self {
        Self::resolve(|k| env::var(k).ok(), crate::telemetry::config::json_mode())
    }

    /// ARCHIVER_OUTPUT_FORMAT wins when set; otherwise `--json` picks JSON.
    fn resolve<F>(lookup: F, json_flag: bool) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = match lookup("ARCHIVER_OUTPUT_FORMAT").as_deref() {
            Some("json") => OutputFormat::Json,
            Some("text") => OutputFormat::Text,
            _ if json_flag => OutputFormat::Json,
            _ => OutputFormat::Text,
        };
        let pretty = lookup("ARCHIVER_OUTPUT_PRETTY").as_deref().is_some_and(is_truthy);
        OutputConfig { format, pretty }
    }
}

/// Envelopes go to stdout under `--json` or when ARCHIVER_OUTPUT_FORMAT
/// names a format; otherwise runs only log to stderr.
pub fn envelopes_enabled() -> bool {
    crate::telemetry::config::json_mode()
        || env::var("ARCHIVER_OUTPUT_FORMAT").is_ok_and(|v| matches!(v.as_str(), "json" | "text"))
}

fn is_truthy(v: &str) -> bool {
    ["1", "true", "yes"].iter().any(|t| v.eq_ignore_ascii_case(t))
}
