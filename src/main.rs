use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use strada::adapters::{BalanceSource, RpcAuthorizationReader, VenueBalanceSource};
use strada::config::AppConfig;
use strada::domain::Venue;
use strada::services::{DispatchWorker, ExecutionDispatcher, StateReconciler};
use strada::store::{DispatchStore, PostgresStore};
use strada::venues::{build_registry, VenueRegistry};

#[derive(Parser)]
#[command(name = "strada", about = "Multi-venue trading signal dispatch engine", version)]
struct Cli {
    /// Configuration directory
    #[arg(long, default_value = "config", env = "STRADA_CONFIG_DIR")]
    config_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the dispatch worker and reconciler loops
    Run,
    /// Process one batch of pending signals and exit
    Process,
    /// Run one reconciliation pass and exit
    Reconcile,
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir).context("loading configuration")?;
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("config error: {error}");
        }
        anyhow::bail!("invalid configuration ({} errors)", errors.len());
    }

    // Keep the appender guard alive for the process lifetime.
    let _log_guard = init_logging(&config);

    let store = Arc::new(
        PostgresStore::new(&config.database.url, config.database.max_connections)
            .await
            .context("connecting to database")?,
    );

    if matches!(cli.command, Command::Migrate) {
        store.migrate().await.context("running migrations")?;
        return Ok(());
    }

    store.migrate().await.context("running migrations")?;

    let registry = Arc::new(build_registry(&config.venues).context("building venue registry")?);
    let balances = balance_source(&config, registry.clone());

    let dispatch_store: Arc<dyn DispatchStore> = store.clone();
    let dispatcher = Arc::new(ExecutionDispatcher::new(
        dispatch_store.clone(),
        registry,
        balances,
        &config.dispatch,
        config.sizing.clone(),
        config.routing.clone(),
    ));

    let reader = Arc::new(
        RpcAuthorizationReader::new(&config.reconciler.rpc_url, config.reconciler.read_timeout_ms)
            .context("building authorization reader")?,
    );
    let reconciler = Arc::new(StateReconciler::new(
        dispatch_store,
        reader,
        &config.reconciler,
    ));

    match cli.command {
        Command::Process => {
            let summary = dispatcher.process_pending().await?;
            println!(
                "executed={} failed={} skipped={}",
                summary.executed, summary.failed, summary.skipped
            );
        }
        Command::Reconcile => {
            let summary = reconciler.reconcile_once().await?;
            println!(
                "checked={} drifted={} read_failures={}",
                summary.checked, summary.drifted, summary.read_failures
            );
        }
        Command::Run => {
            if config.venues.dry_run {
                warn!("Dry-run mode: all venue execution is simulated");
            }

            let worker = DispatchWorker::new(dispatcher, config.dispatch.scan_interval_secs);
            worker.start();
            reconciler.start();

            info!("strada running; press ctrl-c to stop");
            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;

            worker.stop();
            reconciler.stop();
            let stats = worker.stats().await;
            info!(
                ticks = stats.ticks,
                executed = stats.executed,
                failed = stats.failed,
                skipped = stats.skipped,
                "Shutdown complete"
            );
        }
        Command::Migrate => unreachable!("handled above"),
    }

    Ok(())
}

fn balance_source(config: &AppConfig, registry: Arc<VenueRegistry>) -> Arc<dyn BalanceSource> {
    // Balances are read from the first priority venue that actually has
    // a registered backend; paper covers dry-run.
    let primary = config
        .routing
        .venue_priority
        .iter()
        .copied()
        .find(|v| registry.contains(*v))
        .unwrap_or(Venue::Paper);

    Arc::new(VenueBalanceSource::new(registry, primary))
}

fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    match &config.logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "strada.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            if config.logging.json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json().with_writer(writer))
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().with_ansi(false).with_writer(writer))
                    .init();
            }
            Some(guard)
        }
        None => {
            if config.logging.json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .init();
            } else {
                tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
            }
            None
        }
    }
}
