//! Configuration
//!
//! Layered settings, lowest priority first:
//! 1. compiled-in defaults
//! 2. TOML file (`--config <path>`, else `~/.olx-relay/config.toml` if present)
//! 3. environment variables: `OLX_RELAY__<SECTION>__<KEY>`, e.g. `OLX_RELAY__SERVER__PORT=9000`
//! 4. command-line overrides (applied by the binary)

use crate::services::relay::DEFAULT_PUSH_CONCURRENCY;
use crate::services::scheduler::DEFAULT_MAX_CONCURRENT_SESSIONS;
use crate::services::template::{DEFAULT_TEMPLATE, PushTemplate};
use crate::session::Secret;
use ::config::{Config, Environment, File, FileFormat};
use anyhow::{Context, ensure};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "OLX_RELAY";

// ─── Settings ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub source: SourceSettings,
    pub push: PushSettings,
    pub scheduler: SchedulerSettings,
    pub relay: RelaySettings,
    pub http: HttpSettings,
    pub logging: LoggingSettings,
}

/// HTTP gateway listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Marketplace message source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(default = "default_source_base_url")]
    pub base_url: String,
    #[serde(default = "default_messages_path")]
    pub messages_path: String,
}

/// Telegram push sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSettings {
    #[serde(default = "default_push_api_base")]
    pub api_base: String,
    /// Bot API token. Redacted when settings are printed.
    #[serde(default)]
    pub bot_token: Secret,
    /// Body template; must contain `{text}`. May use `{sender}` and `{id}`.
    #[serde(default = "default_template")]
    pub template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_period_secs")]
    pub poll_period_secs: u64,
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    #[serde(default = "default_push_concurrency")]
    pub push_concurrency: usize,
    /// Skip message ids already delivered to a session. Off by default.
    #[serde(default)]
    pub dedup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Per-request timeout for every outbound call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
    /// Write daily-rotated log files here instead of stderr.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_source_base_url() -> String {
    "https://api.olx.ua".to_string()
}

fn default_messages_path() -> String {
    "/messages".to_string()
}

fn default_push_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn default_poll_period_secs() -> u64 {
    10
}

fn default_max_concurrent_sessions() -> usize {
    DEFAULT_MAX_CONCURRENT_SESSIONS
}

fn default_push_concurrency() -> usize {
    DEFAULT_PUSH_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: default_source_base_url(),
            messages_path: default_messages_path(),
        }
    }
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            api_base: default_push_api_base(),
            bot_token: Secret::default(),
            template: default_template(),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_period_secs: default_poll_period_secs(),
            max_concurrent_sessions: default_max_concurrent_sessions(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            push_concurrency: default_push_concurrency(),
            dedup: false,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
            directory: None,
        }
    }
}

impl SchedulerSettings {
    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_period_secs)
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        reqwest::Url::parse(&self.source.base_url)
            .with_context(|| format!("Invalid source.base_url: {}", self.source.base_url))?;
        reqwest::Url::parse(&self.push.api_base)
            .with_context(|| format!("Invalid push.api_base: {}", self.push.api_base))?;
        PushTemplate::new(self.push.template.clone()).context("Invalid push.template")?;

        ensure!(
            self.scheduler.poll_period_secs > 0,
            "scheduler.poll_period_secs must be greater than 0"
        );
        ensure!(
            self.scheduler.max_concurrent_sessions > 0,
            "scheduler.max_concurrent_sessions must be greater than 0"
        );
        ensure!(
            self.relay.push_concurrency > 0,
            "relay.push_concurrency must be greater than 0"
        );
        ensure!(
            self.http.timeout_secs > 0,
            "http.timeout_secs must be greater than 0"
        );
        Ok(())
    }

    /// Effective settings as TOML, secrets redacted.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to render settings as TOML")
    }
}

// ─── Loading ─────────────────────────────────────────────────

/// `~/.olx-relay/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".olx-relay").join("config.toml"))
}

/// Load settings from defaults, the config file and the process environment.
/// An explicit `path` must exist; the default path is optional.
pub fn load(path: Option<&Path>) -> anyhow::Result<Settings> {
    load_with_env(path, None)
}

/// Like [`load`], reading environment overrides from `env` when given
/// instead of the process environment.
pub fn load_with_env(
    path: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> anyhow::Result<Settings> {
    let mut builder = Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(true),
            );
        }
        None => {
            if let Some(default_path) = default_config_path() {
                builder = builder.add_source(
                    File::from(default_path)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(env),
    );

    let settings = builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize::<Settings>()
        .context("Failed to parse configuration")?;

    Ok(settings)
}
