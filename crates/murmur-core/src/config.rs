//! Configuration types for murmur.
//!
//! [`Config::load`] layers the embedded defaults, an optional TOML file and
//! the process environment (`PORT`, `SMTP_HOST`, ...). [`Config::defaults`]
//! returns the embedded defaults without touching the filesystem or the
//! environment (useful in tests).

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
port                   = 3002
bind_address           = "0.0.0.0"
data_path              = "db.json"
admin_url              = "http://localhost:3003"
smtp_port              = 587
rate_limit_max         = 5
rate_limit_window_secs = 3600
io_timeout_ms          = 5000
smtp_timeout_secs      = 10
request_timeout_secs   = 30
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Process-wide configuration, built once at startup and passed down by
/// reference to the server bootstrap and the notification dispatcher.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub data_path: PathBuf,
    /// Moderation console linked from notification emails.
    pub admin_url: String,
    #[serde(default)]
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_pass: Option<String>,
    #[serde(default)]
    pub smtp_from: Option<String>,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    pub io_timeout_ms: u64,
    pub smtp_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

/// Everything the SMTP transport needs. Only exists when host, user and
/// password are all configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load the embedded defaults, then `file` (if given and present), then
    /// the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::build(file, None)
    }

    /// Like [`Config::load`] but reads environment variables from `vars`
    /// instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::build(None, Some(vars))
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    fn build(
        file: Option<&Path>,
        vars: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder
            .add_source(
                config::Environment::default()
                    .ignore_empty(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind_address, self.port).parse()
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn smtp_timeout(&self) -> Duration {
        Duration::from_secs(self.smtp_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// SMTP settings, or `None` when email delivery is not configured.
    pub fn smtp(&self) -> Option<SmtpConfig> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let host = present(&self.smtp_host)?;
        let user = present(&self.smtp_user)?;
        let pass = self.smtp_pass.clone().filter(|p| !p.is_empty())?;
        let from = present(&self.smtp_from).unwrap_or_else(|| user.clone());

        Some(SmtpConfig {
            host,
            port: self.smtp_port,
            user,
            pass,
            from,
            timeout: self.smtp_timeout(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
