// src/config/relay.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::{env, fmt, fs, path::PathBuf, time::Duration};
use tracing::warn;

use crate::poll::PollPolicy;

// --- defaults ---
pub const DEFAULT_BASE_URL: &str = "https://api.realitydefender.com/v1";
pub const DEFAULT_RELAY_CONFIG_PATH: &str = "config/relay.toml";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_POLL_RETRIES: u32 = 10;
pub const DEFAULT_POLL_WAIT_SECS: u64 = 3;
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

// --- env names ---
pub const ENV_API_KEY: &str = "REALITY_DEFENDER_API_KEY";
pub const ENV_BASE_URL: &str = "REALITY_DEFENDER_BASE_URL";
pub const ENV_RELAY_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "RELAY_REQUEST_TIMEOUT_SECS";
pub const ENV_POLL_RETRIES: &str = "RELAY_POLL_RETRIES";
pub const ENV_POLL_WAIT_SECS: &str = "RELAY_POLL_WAIT_SECS";
pub const ENV_MAX_UPLOAD_BYTES: &str = "RELAY_MAX_UPLOAD_BYTES";
pub const ENV_PORT: &str = "PORT";

/// On-disk shape of `config/relay.toml`. Every key is optional.
/// The API key is not a file key; it only comes from the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RelayFile {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    poll_retries: Option<u32>,
    poll_wait_secs: Option<u64>,
    port: Option<u16>,
    max_upload_bytes: Option<usize>,
}

/// Immutable relay configuration, assembled once at startup and shared via `AppState`.
#[derive(Clone)]
pub struct RelayConfig {
    /// `None` means scan endpoints answer 500 without touching the vendor.
    pub api_key: Option<String>,
    pub base_url: String,
    pub request_timeout: Duration,
    pub poll_retries: u32,
    pub poll_wait: Duration,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_retries: DEFAULT_POLL_RETRIES,
            poll_wait: Duration::from_secs(DEFAULT_POLL_WAIT_SECS),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

// Never print the key itself.
impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("poll_retries", &self.poll_retries)
            .field("poll_wait", &self.poll_wait)
            .field("port", &self.port)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl RelayConfig {
    /// Full startup load:
    /// 1) $RELAY_CONFIG_PATH (must exist when set)
    /// 2) config/relay.toml (if present)
    /// 3) built-in defaults
    ///
    /// then environment overrides on top. Call `dotenvy::dotenv()` first if `.env` should count.
    pub fn load() -> Result<Self> {
        let base = match env::var(ENV_RELAY_CONFIG_PATH) {
            Ok(p) => {
                let path = PathBuf::from(p);
                if !path.exists() {
                    return Err(anyhow!(
                        "{ENV_RELAY_CONFIG_PATH} points to non-existent path {}",
                        path.display()
                    ));
                }
                Self::from_file(&path)?
            }
            Err(_) => {
                let path = PathBuf::from(DEFAULT_RELAY_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        let cfg = base.with_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading relay config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing relay config at {}", path.display()))
    }

    /// Defaults overlaid with a TOML document. No environment access.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let file: RelayFile = toml::from_str(toml_str)?;
        let mut cfg = Self::default();
        if let Some(url) = file.base_url {
            cfg.base_url = url;
        }
        if let Some(secs) = file.request_timeout_secs {
            cfg.request_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = file.poll_retries {
            cfg.poll_retries = n;
        }
        if let Some(secs) = file.poll_wait_secs {
            cfg.poll_wait = Duration::from_secs(secs);
        }
        if let Some(port) = file.port {
            cfg.port = port;
        }
        if let Some(max) = file.max_upload_bytes {
            cfg.max_upload_bytes = max;
        }
        cfg.base_url = trim_base_url(&cfg.base_url);
        Ok(cfg)
    }

    /// Apply process environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup (env in production, a map in tests).
    /// Unparsable numbers are ignored with a warning and the previous value is kept.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_key = lookup(ENV_API_KEY)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = trim_base_url(&url);
        }
        if let Some(secs) = parse_env_num::<u64>(ENV_REQUEST_TIMEOUT_SECS, lookup(ENV_REQUEST_TIMEOUT_SECS)) {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = parse_env_num::<u32>(ENV_POLL_RETRIES, lookup(ENV_POLL_RETRIES)) {
            self.poll_retries = n;
        }
        if let Some(secs) = parse_env_num::<u64>(ENV_POLL_WAIT_SECS, lookup(ENV_POLL_WAIT_SECS)) {
            self.poll_wait = Duration::from_secs(secs);
        }
        if let Some(max) = parse_env_num::<usize>(ENV_MAX_UPLOAD_BYTES, lookup(ENV_MAX_UPLOAD_BYTES)) {
            self.max_upload_bytes = max;
        }
        if let Some(port) = parse_env_num::<u16>(ENV_PORT, lookup(ENV_PORT)) {
            self.port = port;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            bail!("base_url must be an http(s) URL, got `{}`", self.base_url);
        }
        if self.request_timeout.is_zero() {
            bail!("request timeout must be at least one second");
        }
        if self.poll_retries == 0 {
            warn!("poll_retries=0: pending scans will be returned without polling");
        }
        Ok(())
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        let key = key.trim();
        self.api_key = if key.is_empty() { None } else { Some(key.to_string()) };
        self
    }

    pub fn with_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.base_url = trim_base_url(url.as_ref());
        self
    }

    pub fn with_poll(mut self, retries: u32, wait: Duration) -> Self {
        self.poll_retries = retries;
        self.poll_wait = wait;
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            retries: self.poll_retries,
            wait: self.poll_wait,
        }
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_env_num<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparsable numeric override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_reference_behavior() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.request_timeout, Duration::from_secs(15));
        assert_eq!(cfg.poll_retries, 10);
        assert_eq!(cfg.poll_wait, Duration::from_secs(3));
        assert_eq!(cfg.port, 5000);
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn toml_overlays_defaults_and_trims_base_url() {
        let cfg = RelayConfig::from_toml_str(
            r#"
base_url = "http://localhost:9000/v1/"
poll_retries = 4
"#,
        )
        .unwrap();
        assert_eq!(cfg.base_url, "http://localhost:9000/v1");
        assert_eq!(cfg.poll_retries, 4);
        assert_eq!(cfg.poll_wait, Duration::from_secs(DEFAULT_POLL_WAIT_SECS));
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        assert!(RelayConfig::from_toml_str(r#"api_key = "nope""#).is_err());
    }

    #[test]
    fn env_overrides_win_and_bad_numbers_are_ignored() {
        let cfg = RelayConfig::default().with_overrides_from(lookup_from(&[
            (ENV_API_KEY, "  secret  "),
            (ENV_POLL_RETRIES, "3"),
            (ENV_POLL_WAIT_SECS, "soon"),
            (ENV_PORT, "8080"),
        ]));
        assert_eq!(cfg.api_key(), Some("secret"));
        assert_eq!(cfg.poll_retries, 3);
        assert_eq!(cfg.poll_wait, Duration::from_secs(DEFAULT_POLL_WAIT_SECS));
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let cfg = RelayConfig::default().with_overrides_from(lookup_from(&[(ENV_API_KEY, "   ")]));
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn builder_key_is_trimmed_like_env_key() {
        let built = RelayConfig::default().with_api_key("  secret\n");
        let from_env = RelayConfig::default().with_overrides_from(lookup_from(&[(ENV_API_KEY, "  secret\n")]));
        assert_eq!(built.api_key(), Some("secret"));
        assert_eq!(built.api_key(), from_env.api_key());
        assert!(RelayConfig::default().with_api_key(" \t ").api_key().is_none());
    }

    #[test]
    fn debug_output_redacts_key() {
        let cfg = RelayConfig::default().with_api_key("super-secret");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn validate_rejects_non_http_base_url() {
        let cfg = RelayConfig::default().with_base_url("ftp://example.com");
        assert!(cfg.validate().is_err());
    }
}
