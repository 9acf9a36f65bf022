//! Environment-driven configuration.
//!
//! All settings come from the process environment (a `.env` file is loaded
//! by `main` before parsing). Values are read once at startup and immutable
//! afterwards. Parsing goes through an injectable lookup so tests never
//! touch the real environment.
//!
//! Recognized variables: `PREFIX`, `PORT`, `SESSION_ID`, `TIME_ZONE`,
//! `AUTO_STATUS_REACT`, `AUTO_BIO_ENABLED`, `BIO_UPDATE_INTERVAL` (ms),
//! `STATUS_VIEW_INTERVAL` (ms), `STATUS_VIEW_LIMIT`,
//! `STATUS_REACT_EMOJIS` (comma-separated), `BIO_TEMPLATES`
//! (semicolon-separated, `{time}`/`{date}`/`{randomEmoji}` placeholders),
//! `SESSION_DIR`, `DEPLOYMENT_LOG`, `SESSION_VAULT_URL`.

use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Fallback time zone when `TIME_ZONE` is unset or unparseable.
pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::Africa::Nairobi;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BIO_INTERVAL_MS: u64 = 60_000;
const DEFAULT_STATUS_INTERVAL_MS: u64 = 30_000;
const DEFAULT_STATUS_LIMIT: usize = 25;
const DEFAULT_SESSION_DIR: &str = "sessions";
const DEFAULT_DEPLOYMENT_LOG: &str = "deployment_log.json";
const DEFAULT_VAULT_URL: &str = "https://mega.nz/file";

#[derive(Debug, Clone)]
pub struct Config {
    /// Command prefix for the message handlers behind the router boundary.
    pub prefix: String,
    pub port: u16,
    /// Remote session identifier, `StatusBot~<fileId>#<decryptKey>`.
    pub session_id: Option<String>,
    pub time_zone: Tz,
    pub auto_status_react: bool,
    pub auto_bio_enabled: bool,
    pub bio_update_interval: Duration,
    pub status_view_interval: Duration,
    pub status_view_limit: usize,
    pub status_react_emojis: Vec<String>,
    pub bio_templates: Vec<String>,
    pub session_dir: PathBuf,
    pub deployment_log: PathBuf,
    pub session_vault_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            prefix: get("PREFIX").unwrap_or_else(|| ".".to_string()),
            port: parse_or(&get, "PORT", DEFAULT_PORT),
            session_id: get("SESSION_ID").filter(|s| !s.is_empty()),
            time_zone: time_zone(&get),
            auto_status_react: flag(&get, "AUTO_STATUS_REACT", true),
            auto_bio_enabled: flag(&get, "AUTO_BIO_ENABLED", true),
            bio_update_interval: Duration::from_millis(parse_or(
                &get,
                "BIO_UPDATE_INTERVAL",
                DEFAULT_BIO_INTERVAL_MS,
            )),
            status_view_interval: Duration::from_millis(parse_or(
                &get,
                "STATUS_VIEW_INTERVAL",
                DEFAULT_STATUS_INTERVAL_MS,
            )),
            status_view_limit: parse_or(&get, "STATUS_VIEW_LIMIT", DEFAULT_STATUS_LIMIT),
            status_react_emojis: list(&get, "STATUS_REACT_EMOJIS", ',')
                .unwrap_or_else(default_emojis),
            bio_templates: list(&get, "BIO_TEMPLATES", ';').unwrap_or_else(default_templates),
            session_dir: get("SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_DIR)),
            deployment_log: get("DEPLOYMENT_LOG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEPLOYMENT_LOG)),
            session_vault_url: get("SESSION_VAULT_URL")
                .unwrap_or_else(|| DEFAULT_VAULT_URL.to_string()),
        }
    }
}

fn default_emojis() -> Vec<String> {
    ["💚", "❤️", "🔥", "😍", "💯", "🎉", "👍", "🙌"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_templates() -> Vec<String> {
    [
        "✨ Online & automated — {time} {randomEmoji}",
        "🤖 Status Bot on duty, {date}",
        "💫 Watching statuses since {time} {randomEmoji}",
        "📅 {date} • ⏰ {time} {randomEmoji}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Feature toggle semantics: explicit `"true"` enables, any other explicit
/// value disables, unset falls back to `default`.
fn flag(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match get(key) {
        Some(value) => value == "true",
        None => default,
    }
}

fn parse_or<T: std::str::FromStr + Copy>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(%key, %raw, "unparseable value, using default");
            default
        }),
        None => default,
    }
}

fn list(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    separator: char,
) -> Option<Vec<String>> {
    let raw = get(key)?;
    let items: Vec<String> = raw
        .split(separator)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        warn!(%key, "empty list, using default");
        return None;
    }
    Some(items)
}

fn time_zone(get: &impl Fn(&str) -> Option<String>) -> Tz {
    match get("TIME_ZONE") {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(%raw, "unknown TIME_ZONE, using default");
            DEFAULT_TIME_ZONE
        }),
        None => DEFAULT_TIME_ZONE,
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        prefix: ".".to_string(),
        port: 3000,
        session_id: None,
        time_zone: DEFAULT_TIME_ZONE,
        auto_status_react: true,
        auto_bio_enabled: true,
        bio_update_interval: Duration::from_secs(60),
        status_view_interval: Duration::from_secs(30),
        status_view_limit: 25,
        status_react_emojis: vec!["💚".to_string(), "🔥".to_string()],
        bio_templates: vec!["Bot online {time} {date} {randomEmoji}".to_string()],
        session_dir: PathBuf::from("sessions"),
        deployment_log: PathBuf::from("deployment_log.json"),
        session_vault_url: DEFAULT_VAULT_URL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_with_empty_environment() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.prefix, ".");
        assert_eq!(config.port, 3000);
        assert_eq!(config.session_id, None);
        assert_eq!(config.time_zone, DEFAULT_TIME_ZONE);
        assert!(config.auto_status_react);
        assert!(config.auto_bio_enabled);
        assert_eq!(config.bio_update_interval, Duration::from_millis(60_000));
        assert_eq!(config.status_view_interval, Duration::from_millis(30_000));
        assert_eq!(config.status_view_limit, 25);
        assert!(!config.status_react_emojis.is_empty());
        assert!(!config.bio_templates.is_empty());
        assert_eq!(config.session_dir, PathBuf::from("sessions"));
        assert_eq!(config.deployment_log, PathBuf::from("deployment_log.json"));
    }

    #[test]
    fn every_variable_is_recognized() {
        let pairs = [
            ("PREFIX", "!"),
            ("PORT", "8080"),
            ("SESSION_ID", "StatusBot~file#key"),
            ("TIME_ZONE", "Europe/Berlin"),
            ("AUTO_STATUS_REACT", "true"),
            ("AUTO_BIO_ENABLED", "false"),
            ("BIO_UPDATE_INTERVAL", "120000"),
            ("STATUS_VIEW_INTERVAL", "45000"),
            ("STATUS_VIEW_LIMIT", "10"),
            ("STATUS_REACT_EMOJIS", "💚, 🔥 ,🎉"),
            ("BIO_TEMPLATES", "a {time}; b {date}"),
            ("SESSION_DIR", "/data/sessions"),
            ("DEPLOYMENT_LOG", "/data/deploys.json"),
            ("SESSION_VAULT_URL", "https://vault.example/files"),
        ];
        let config = Config::from_lookup(lookup(&pairs));

        assert_eq!(config.prefix, "!");
        assert_eq!(config.port, 8080);
        assert_eq!(config.session_id.as_deref(), Some("StatusBot~file#key"));
        assert_eq!(config.time_zone, chrono_tz::Europe::Berlin);
        assert!(config.auto_status_react);
        assert!(!config.auto_bio_enabled);
        assert_eq!(config.bio_update_interval, Duration::from_millis(120_000));
        assert_eq!(config.status_view_interval, Duration::from_millis(45_000));
        assert_eq!(config.status_view_limit, 10);
        assert_eq!(config.status_react_emojis, vec!["💚", "🔥", "🎉"]);
        assert_eq!(config.bio_templates, vec!["a {time}", "b {date}"]);
        assert_eq!(config.session_dir, PathBuf::from("/data/sessions"));
        assert_eq!(config.deployment_log, PathBuf::from("/data/deploys.json"));
        assert_eq!(config.session_vault_url, "https://vault.example/files");
    }

    #[test]
    fn flags_require_the_literal_true() {
        let config = Config::from_lookup(lookup(&[
            ("AUTO_STATUS_REACT", "TRUE"),
            ("AUTO_BIO_ENABLED", "yes"),
        ]));
        assert!(!config.auto_status_react);
        assert!(!config.auto_bio_enabled);
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "not-a-port"),
            ("BIO_UPDATE_INTERVAL", "soon"),
            ("STATUS_VIEW_LIMIT", "-3"),
        ]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.bio_update_interval, Duration::from_millis(60_000));
        assert_eq!(config.status_view_limit, 25);
    }

    #[test]
    fn unknown_time_zone_falls_back() {
        let config = Config::from_lookup(lookup(&[("TIME_ZONE", "Mars/Olympus")]));
        assert_eq!(config.time_zone, DEFAULT_TIME_ZONE);
    }

    #[test]
    fn empty_lists_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("STATUS_REACT_EMOJIS", " , ,"),
            ("BIO_TEMPLATES", ";;"),
        ]));
        assert!(!config.status_react_emojis.is_empty());
        assert!(!config.bio_templates.is_empty());
    }

    #[test]
    fn empty_session_id_counts_as_unset() {
        let config = Config::from_lookup(lookup(&[("SESSION_ID", "")]));
        assert_eq!(config.session_id, None);
    }
}
