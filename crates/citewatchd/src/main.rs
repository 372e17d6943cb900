// # citewatchd - Citation Watch Daemon
//
// The citewatchd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building the Scholar source, SMTP notifier and state store
// 4. Running the watch engine until SIGINT/SIGTERM
//
// All watch logic lives in citewatch-core.
//
// ## Configuration
//
// ### Author (exactly one required; the id wins if both are set)
// - `AUTHOR_ID`: Google Scholar profile id
// - `AUTHOR_NAME`: Author name, resolved through Scholar search
//
// ### Email
// - `SMTP_SERVER`: SMTP host (default: smtp.gmail.com)
// - `SMTP_PORT`: SMTP port (default: 587; 465 = implicit TLS)
// - `SENDER_EMAIL`: Sender address and SMTP username
// - `SENDER_PASSWORD`: SMTP password
// - `RECEIVER_EMAIL`: Notification destination
//
// ### Watcher
// - `CITEWATCH_STATE_PATH`: State file (default: last_citation_count.txt)
// - `CITEWATCH_CHECK_INTERVAL_SECS`: Seconds between checks (default: 3600)
// - `CITEWATCH_SCHOLAR_URL`: Scholar base URL (default: https://scholar.google.com)
// - `CITEWATCH_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export AUTHOR_ID=qc6CJjYAAAAJ
// export SENDER_EMAIL=watcher@gmail.com
// export SENDER_PASSWORD=app-password
// export RECEIVER_EMAIL=me@example.org
//
// citewatchd
// ```

use anyhow::{Context, Result};
use citewatch_core::config::{
    AuthorSelector, DEFAULT_STATE_PATH, EngineConfig, SmtpConfig, StateStoreConfig, WatchConfig,
};
use citewatch_core::{EngineEvent, WatchEngine, state};
use citewatch_notify_smtp::SmtpNotifier;
use citewatch_source_scholar::{DEFAULT_BASE_URL, ScholarSource};
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Longest accepted check interval (one week)
const MAX_CHECK_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum WatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<WatchExitCode> for ExitCode {
    fn from(code: WatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    author: AuthorSelector,
    smtp: SmtpConfig,
    state_path: String,
    check_interval_secs: u64,
    scholar_url: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    ///
    /// Blank values are treated as unset.
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let author = AuthorSelector::resolve(
            get("AUTHOR_ID").as_deref(),
            get("AUTHOR_NAME").as_deref(),
        )
        .context("Set AUTHOR_ID (preferred) or AUTHOR_NAME")?;

        let smtp_port = match get("SMTP_PORT") {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("SMTP_PORT must be a port number. Got: {}", port))?,
            None => 587,
        };

        let check_interval_secs = match get("CITEWATCH_CHECK_INTERVAL_SECS") {
            Some(secs) => secs.trim().parse::<u64>().with_context(|| {
                format!(
                    "CITEWATCH_CHECK_INTERVAL_SECS must be a number of seconds. Got: {}",
                    secs
                )
            })?,
            None => 3600,
        };

        Ok(Self {
            author,
            smtp: SmtpConfig {
                server: get("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                port: smtp_port,
                sender: get("SENDER_EMAIL").unwrap_or_default(),
                password: get("SENDER_PASSWORD").unwrap_or_default(),
                receiver: get("RECEIVER_EMAIL").unwrap_or_default(),
            },
            state_path: get("CITEWATCH_STATE_PATH")
                .unwrap_or_else(|| DEFAULT_STATE_PATH.to_string()),
            check_interval_secs,
            scholar_url: get("CITEWATCH_SCHOLAR_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            log_level: get("CITEWATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks that every required email setting is present and that
    /// numeric and enumerated values are in range.
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("SENDER_EMAIL", &self.smtp.sender),
            ("SENDER_PASSWORD", &self.smtp.password),
            ("RECEIVER_EMAIL", &self.smtp.receiver),
        ] {
            if value.is_empty() {
                anyhow::bail!("{} is required. Set it via: export {}=...", name, name);
            }
        }

        self.smtp.validate()?;

        if !(1..=MAX_CHECK_INTERVAL_SECS).contains(&self.check_interval_secs) {
            anyhow::bail!(
                "CITEWATCH_CHECK_INTERVAL_SECS must be between 1 and {} seconds. Got: {}",
                MAX_CHECK_INTERVAL_SECS,
                self.check_interval_secs
            );
        }

        if !self.scholar_url.starts_with("https://") && !self.scholar_url.starts_with("http://") {
            anyhow::bail!(
                "CITEWATCH_SCHOLAR_URL must use HTTP or HTTPS scheme. Got: {}",
                self.scholar_url
            );
        }

        self.tracing_level()?;

        Ok(())
    }

    /// Parse the configured log level
    fn tracing_level(&self) -> Result<Level> {
        parse_log_level(Some(&self.log_level))
    }

    /// Core watcher configuration
    fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            author: self.author.clone(),
            state_store: StateStoreConfig::File {
                path: self.state_path.clone(),
            },
            engine: EngineConfig::default()
                .with_check_interval(Duration::from_secs(self.check_interval_secs)),
        }
    }
}

fn main() -> ExitCode {
    // Initialize tracing first so warnings raised while loading the
    // configuration are not lost
    let log_level = match parse_log_level(env::var("CITEWATCH_LOG_LEVEL").ok().as_deref()) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return WatchExitCode::ConfigError.into();
        }
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return WatchExitCode::ConfigError.into();
    }

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return WatchExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation error: {:#}", e);
        return WatchExitCode::ConfigError.into();
    }

    info!("Starting citewatchd");
    info!("Watching {}", config.author);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return WatchExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (engine, event_rx) = match build_engine(&config).await {
            Ok(built) => built,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return WatchExitCode::ConfigError;
            }
        };

        tokio::spawn(log_events(event_rx));

        match engine.run().await {
            Ok(()) => {
                info!("citewatchd stopped");
                WatchExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Daemon error: {}", e);
                WatchExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Parse a log level name, defaulting to info when unset or blank
fn parse_log_level(value: Option<&str>) -> Result<Level> {
    let value = value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or("info");
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "CITEWATCH_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}

/// Build the engine and its collaborators
async fn build_engine(config: &Config) -> Result<(WatchEngine, mpsc::Receiver<EngineEvent>)> {
    let source = ScholarSource::with_base_url(config.scholar_url.clone());
    let notifier = SmtpNotifier::new(&config.smtp).context("Invalid email settings")?;

    let watch_config = config.watch_config();
    let state_store = state::from_config(&watch_config.state_store)
        .await
        .context("Failed to open state file")?;

    info!("Count source: scholar ({})", source.base_url());
    info!(
        "Notifier: smtp via {}:{} to {}",
        config.smtp.server, config.smtp.port, config.smtp.receiver
    );

    let built = WatchEngine::new(
        Box::new(source),
        Box::new(notifier),
        state_store,
        watch_config,
    )?;

    Ok(built)
}

/// Drain engine events into the debug log
async fn log_events(mut event_rx: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = event_rx.recv().await {
        debug!("Engine event: {:?}", event);
    }
}
