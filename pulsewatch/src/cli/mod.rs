//! CLI module for pulsewatch
//!
//! Provides the monitor daemon and the administrative commands that operate
//! on the same database.

/// endpoint subcommand
pub mod endpoint;
/// check / history / uptime subcommands
pub mod report;
/// serve subcommand
pub mod serve;

use crate::bootstrap::{self, AppContext};
use crate::config::{get_database_url, MonitorConfig, NotifyConfig};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

/// pulsewatch - HTTP endpoint uptime monitor with status-change alerts
#[derive(Parser, Debug)]
#[command(name = "pulsewatch")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    PULSEWATCH_DATABASE_URL           Database URL (default: sqlite:data/pulsewatch.db)
    PULSEWATCH_LOG_LEVEL              Log filter (default: info, falls back to RUST_LOG)
    PULSEWATCH_LOG_DIR                Also write daily rolling log files to this directory
    PULSEWATCH_CHECK_INTERVAL_SECS    Seconds between scheduled checks (default: 30)
    PULSEWATCH_PROBE_TIMEOUT_SECS     Probe timeout in seconds (default: 15)
    PULSEWATCH_NOTIFY_COOLDOWN_SECS   Minimum seconds between alerts per destination (default: 3600)
    PULSEWATCH_STARTUP_DELAY_SECS     Delay before the first check (default: 5)
    PULSEWATCH_MAX_CONCURRENT_PROBES  Probes in flight per tick (default: 20)
    PULSEWATCH_TELEGRAM_BOT_TOKEN     Telegram bot token (alerts are only logged if unset)
    PULSEWATCH_TELEGRAM_API_URL       Telegram API base URL (default: https://api.telegram.org)
"#)]
pub struct Cli {
    /// Database URL (overrides PULSEWATCH_DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the monitor until interrupted (default)
    Serve(serve::ServeArgs),
    /// Manage monitored endpoints
    Endpoint(endpoint::EndpointArgs),
    /// Run one check now and print the observation
    Check(report::CheckArgs),
    /// Show recent observations for an endpoint
    History(report::HistoryArgs),
    /// Show the uptime percentage for an endpoint
    Uptime(report::UptimeArgs),
}

/// Options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Database URL override
    pub database_url: Option<String>,
    /// JSON output
    pub json: bool,
}

impl From<&Cli> for GlobalOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            database_url: cli.database_url.clone(),
            json: cli.json,
        }
    }
}

impl GlobalOptions {
    /// Resolve the database URL from the flag or the environment
    pub fn database_url(&self) -> String {
        self.database_url.clone().unwrap_or_else(get_database_url)
    }

    /// Open the database and build the monitor components
    pub async fn open(&self) -> anyhow::Result<AppContext> {
        let url = self.database_url();
        bootstrap::initialize(&url, MonitorConfig::from_env(), &NotifyConfig::from_env())
            .await
            .with_context(|| format!("failed to open {}", url))
    }
}

/// Print a value as pretty JSON
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse an endpoint ID argument
pub(crate) fn parse_endpoint_id(value: &str) -> Result<uuid::Uuid, String> {
    uuid::Uuid::parse_str(value.trim()).map_err(|e| format!("invalid endpoint id: {}", e))
}
