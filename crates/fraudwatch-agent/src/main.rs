use anyhow::{Context, Result};
use clap::Parser;
use fraudwatch_action::executor::SystemExecutor;
use fraudwatch_action::{ActionDispatcher, ActionExecutor};
use fraudwatch_config::ConfigSnapshot;
use fraudwatch_monitor::monitors::{
    DangerousDestinations, SimultaneousCalls, SmallDurationCalls, UnexpectedDestinations,
};
use fraudwatch_monitor::{runner, Monitor};
use fraudwatch_softswitch::asterisk::AsteriskSoftswitch;
use fraudwatch_softswitch::Softswitch;
use sqlx::mysql::MySqlPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Upper bound on a single action-chain step (one email, one command).
const ACTION_STEP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "fraudwatch", about = "Telephony fraud monitoring agent")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "/etc/fraudwatch/fraudwatch.json")]
    config: PathBuf,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_to: Option<PathBuf>,

    /// Override the CDR database password from the configuration file
    #[arg(long)]
    db_pass: Option<String>,
}

fn init_tracing(log_to: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_to {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("could not open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Arc::new(file)).init();
        }
        None => builder.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_to.as_ref())?;

    let mut config = ConfigSnapshot::load(&cli.config)
        .with_context(|| format!("could not load {}", cli.config.display()))?;
    if let Some(pass) = cli.db_pass {
        config.softswitch.cdrs_source.user_password = pass;
    }
    let config = Arc::new(config);

    tracing::info!(
        hostname = %config.general.hostname,
        config = %cli.config.display(),
        "fraudwatch starting"
    );

    // The pool is only built when a CDR-backed monitor needs it. Connections
    // are established lazily so a database that is down at boot does not
    // prevent the agent from coming up; affected monitors fail their ticks
    // until it returns.
    let cdr_pool = if config.monitors.any_cdr_monitor_enabled() {
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .connect_lazy(&config.softswitch.cdrs_source.connect_url())
            .context("invalid CDR database connection URL")?;
        tracing::info!(
            host = %config.softswitch.cdrs_source.host,
            database = %config.softswitch.cdrs_source.database_name,
            "CDR database pool configured"
        );
        Some(pool)
    } else {
        None
    };

    let softswitch: Arc<dyn Softswitch> = Arc::new(AsteriskSoftswitch::new(
        cdr_pool,
        config.softswitch.cdrs_source.table_name.clone(),
    ));

    let executor: Arc<dyn ActionExecutor> =
        Arc::new(SystemExecutor::new(&config.actions.email)?);
    let (dispatcher, dispatch_handle) =
        ActionDispatcher::new(config.clone(), executor, ACTION_STEP_TIMEOUT);
    tokio::spawn(dispatcher.run());

    let started_at = Instant::now();
    let mut monitors: Vec<Box<dyn Monitor>> = Vec::new();

    if let Some(mc) = &config.monitors.dangerous_destinations {
        if mc.enabled {
            monitors.push(Box::new(DangerousDestinations::new(
                mc.clone(),
                softswitch.clone(),
                started_at,
            )));
        }
    }
    if let Some(mc) = &config.monitors.unexpected_destinations {
        if mc.enabled {
            monitors.push(Box::new(UnexpectedDestinations::new(
                mc.clone(),
                softswitch.clone(),
                started_at,
            )));
        }
    }
    if let Some(mc) = &config.monitors.small_duration_calls {
        if mc.enabled {
            monitors.push(Box::new(SmallDurationCalls::new(
                mc.clone(),
                softswitch.clone(),
                started_at,
            )));
        }
    }
    if let Some(mc) = &config.monitors.simultaneous_calls {
        if mc.enabled {
            monitors.push(Box::new(SimultaneousCalls::new(
                mc.clone(),
                softswitch.clone(),
            )));
        }
    }

    if monitors.is_empty() {
        tracing::warn!("no monitor is enabled, nothing to do");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::with_capacity(monitors.len());
    for monitor in monitors {
        handles.push(tokio::spawn(runner::run(
            monitor,
            dispatch_handle.clone(),
            shutdown_rx.clone(),
        )));
    }

    signal::ctrl_c()
        .await
        .context("could not listen for the shutdown signal")?;
    tracing::info!("shutdown signal received, stopping monitors");

    // Monitors observe the flip on their next select and return.
    let _ = shutdown_tx.send(true);
    for handle in handles {
        let _ = handle.await;
    }

    tracing::info!("fraudwatch stopped");
    Ok(())
}
