// Process configuration.
//
// Purpose
// - Command line flags (clap) and the handler set derived from environment options.
//
// Responsibilities
// - Pick the log level from -v / -d.
// - Build every handler whose options are complete; warn about and skip the rest.

use crate::modules::package_updates::adapters::outbound::handlers::archrv::{ArchRvConfig, ArchRvHandler};
use crate::modules::package_updates::adapters::outbound::handlers::telegram::{
    TelegramConfig, TelegramHandler,
};
use crate::modules::package_updates::adapters::outbound::handlers::uptime_kuma::{
    UptimeKumaConfig, UptimeKumaPush,
};
use crate::modules::package_updates::adapters::outbound::handlers::{HandlerOptions, Outbound};
use crate::modules::package_updates::core::ports::{HealthSignal, UpdateHandler};
use crate::modules::package_updates::use_cases::dispatch_updates::engine::{
    BootstrapPolicy, EngineConfig,
};
use crate::modules::package_updates::use_cases::dispatch_updates::fan_out::HandlerRegistry;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASEURL: &str = "https://archriscv.felixc.at/repo";
pub const DEFAULT_LOGURL: &str = "https://archriscv.felixc.at/.status/latestlogs.txt";

#[derive(Debug, Clone, Parser)]
#[command(name = "package_updates", version, about = "Announce package updates of pacman repositories")]
pub struct Args {
    /// Log at info level
    #[arg(short, long)]
    pub verbose: bool,

    /// Log at debug level
    #[arg(short, long)]
    pub debug: bool,

    /// Repository mirror; each database is fetched from <baseurl>/<repo>/<repo>.db
    #[arg(long, env = "PACKAGE_UPDATES_BASEURL", default_value = DEFAULT_BASEURL)]
    pub baseurl: String,

    /// Build farm failure log
    #[arg(long, env = "PACKAGE_UPDATES_LOGURL", default_value = DEFAULT_LOGURL)]
    pub logurl: String,

    /// Repositories to watch, in merge order
    #[arg(long = "repo", default_values_t = ["core".to_string(), "extra".to_string(), "community".to_string()])]
    pub repos: Vec<String>,

    /// Directory for cached databases and the failure watermark
    #[arg(long, default_value = "db")]
    pub cache_dir: PathBuf,

    /// Seconds between polls
    #[arg(long, default_value_t = 60)]
    pub interval: u64,

    /// Log deliveries instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Serve /health and /status on this address
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Announce every package as New when there is no cached state
    #[arg(long)]
    pub announce_bootstrap: bool,
}

impl Args {
    /// Default directive for the tracing filter when RUST_LOG is unset.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            interval: Duration::from_secs(self.interval),
            bootstrap: if self.announce_bootstrap {
                BootstrapPolicy::Announce
            } else {
                BootstrapPolicy::Seed
            },
        }
    }
}

/// Every update handler whose options are complete, in a fixed order.
pub fn build_handlers(options: &HandlerOptions, outbound: &Outbound) -> HandlerRegistry {
    let mut handlers: Vec<Arc<dyn UpdateHandler>> = Vec::new();
    match ArchRvConfig::from_options(options) {
        Ok(config) => handlers.push(Arc::new(ArchRvHandler::new(config, outbound.clone()))),
        Err(err) => tracing::warn!(error = %err, "archrv handler disabled"),
    }
    match TelegramConfig::from_options(options) {
        Ok(config) => handlers.push(Arc::new(TelegramHandler::new(config, outbound.clone()))),
        Err(err) => tracing::warn!(error = %err, "telegram handler disabled"),
    }
    HandlerRegistry::new(handlers)
}

pub fn build_health_signal(options: &HandlerOptions, outbound: &Outbound) -> Option<Arc<dyn HealthSignal>> {
    match UptimeKumaConfig::from_options(options) {
        Ok(config) => Some(Arc::new(UptimeKumaPush::new(config, outbound.clone()))),
        Err(err) => {
            tracing::warn!(error = %err, "uptime kuma push disabled");
            None
        }
    }
}
