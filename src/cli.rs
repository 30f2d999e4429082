//! Command-line interface.

use crate::config::Settings;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "olx-relay",
    version,
    about = "Polls marketplace messages for registered users and forwards them to Telegram"
)]
pub struct Cli {
    /// Path to a TOML config file (default: ~/.olx-relay/config.toml)
    #[arg(short, long, env = "OLX_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Gateway bind address
    #[arg(long)]
    pub bind: Option<String>,

    /// Gateway port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Seconds between poll cycles
    #[arg(long, value_name = "SECS")]
    pub poll_period: Option<u64>,

    /// Do not start the background poll loop
    #[arg(long)]
    pub no_scheduler: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Apply command-line flags on top of loaded settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(bind) = &self.bind {
            settings.server.bind = bind.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(secs) = self.poll_period {
            settings.scheduler.poll_period_secs = secs;
        }
        if self.no_scheduler {
            settings.scheduler.enabled = false;
        }
        if self.log_json {
            settings.logging.json = true;
        }
    }
}
