//! Binary entry point for reddit2dynalist.
//!
//! Polls Reddit for newly saved items and appends them to a Dynalist
//! document.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow unnecessary_wraps for consistent command function signatures
#![allow(clippy::unnecessary_wraps)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use reddit2dynalist::config::CONFIG_PATH_ENV;
use reddit2dynalist::gc::RetentionGarbageCollector;
use reddit2dynalist::observability::{self, ObservabilityConfig, ObservabilityHandle};
use reddit2dynalist::services::{CycleContext, SchedulerConfig, SyncOptions};
use reddit2dynalist::sink::DynalistClient;
use reddit2dynalist::source::RedditClient;
use reddit2dynalist::storage::JsonFileBackend;
use reddit2dynalist::{
    AppConfig, DedupStore, DocumentId, DocumentSink, EntryRenderer, Scheduler, StateBackend,
    SyncService,
};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// reddit2dynalist - Mirror saved Reddit items into a Dynalist document.
#[derive(Parser)]
#[command(name = "reddit2dynalist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Poll on an interval until interrupted (default).
    Run,

    /// Run a single sync cycle and exit.
    Once {
        /// Render and log entries without appending or recording them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show dedup state.
    Status,
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let command = cli.command.unwrap_or(Commands::Run);
    let mut observability_config =
        ObservabilityConfig::from_settings(&config.logging, &config.metrics, cli.verbose);
    observability_config.metrics_expose &= matches!(command, Commands::Run);

    let obs_handle = match observability::init(observability_config) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    let result = match command {
        Commands::Run => cmd_run(config).await,
        Commands::Once { dry_run } => cmd_once(config, dry_run, &obs_handle).await,
        Commands::Status => cmd_status(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting with error");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration from file and environment.
///
/// `path` comes from `--config` or `$REDDIT2DYNALIST_CONFIG_PATH`.
fn load_config(path: Option<&str>) -> CliResult<AppConfig> {
    let config = match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(config_path) => AppConfig::load_from_file(Path::new(config_path))?,
        None => AppConfig::load_default(),
    };

    Ok(config.with_env_overrides())
}

/// Verifies credentials, resolves the document and loads the store.
///
/// Blocking: talks to both APIs.
fn prepare(
    config: &AppConfig,
    dry_run: bool,
) -> reddit2dynalist::Result<(SyncService, DedupStore)> {
    config.validate()?;

    let reddit = RedditClient::new(config.reddit_credentials()?, &config.http);
    reddit.verify_authentication()?;

    let dynalist = DynalistClient::new(config.dynalist_api_key()?, &config.http)
        .with_base_url(config.dynalist.base_url.clone());
    let document = match &config.dynalist.document_id {
        Some(id) => DocumentId::new(id.clone()),
        None => dynalist.resolve_document(&config.dynalist.document_name)?,
    };

    let backend: Arc<dyn StateBackend> = Arc::new(JsonFileBackend::new(&config.sync.state_path));
    let store = DedupStore::load(backend.as_ref());

    let service = SyncService::new(Arc::new(reddit), Arc::new(dynalist), backend, document)
        .with_renderer(EntryRenderer::new(config.sync.link_host.clone()))
        .with_gc(RetentionGarbageCollector::new(config.retention))
        .with_options(SyncOptions {
            fetch_limit: config.sync.fetch_limit,
            dry_run,
        });

    Ok((service, store))
}

async fn prepare_blocking(
    config: &AppConfig,
    dry_run: bool,
) -> CliResult<(SyncService, DedupStore)> {
    let config = config.clone();
    let prepared = tokio::task::spawn_blocking(move || prepare(&config, dry_run)).await??;
    Ok(prepared)
}

/// Cancels `token` on Ctrl-C or SIGTERM.
fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown requested");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {},
                _ = term.recv() => {},
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Cannot listen for SIGTERM, using Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        },
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn cmd_run(config: AppConfig) -> CliResult<()> {
    let (service, store) = prepare_blocking(&config, false).await?;
    let service = Arc::new(service);

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    let scheduler = Scheduler::new(
        Arc::clone(&service),
        SchedulerConfig {
            interval: config.sync.interval,
            cycle_timeout: config.sync.cycle_timeout,
        },
    );
    let store = scheduler.run(store, shutdown).await;

    tokio::task::spawn_blocking(move || store.persist(service.backend())).await??;
    Ok(())
}

/// Runs one cycle. With metrics enabled there is no listener, so the
/// cycle's metrics are printed after the summary instead.
async fn cmd_once(
    config: AppConfig,
    dry_run: bool,
    observability: &ObservabilityHandle,
) -> CliResult<()> {
    let (service, mut store) = prepare_blocking(&config, dry_run).await?;

    let cancel = CancellationToken::new();
    cancel_on_signal(cancel.clone());
    let ctx = CycleContext::new(chrono::Utc::now(), config.sync.cycle_timeout, cancel);

    let report =
        tokio::task::spawn_blocking(move || service.run_cycle(&mut store, &ctx)).await??;
    println!("{}", report.summary());
    if let Some(metrics) = observability.metrics() {
        println!();
        print!("{}", metrics.render());
    }
    Ok(())
}

fn cmd_status(config: &AppConfig) -> CliResult<()> {
    let backend = JsonFileBackend::new(&config.sync.state_path);
    let store = DedupStore::load(&backend);

    println!("reddit2dynalist status");
    println!("======================");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("State file: {}", backend.path().display());
    println!(
        "  {}",
        if backend.path().exists() {
            "Present"
        } else {
            "Will be created on first cycle"
        }
    );
    println!("Records: {}", store.len());
    match store.oldest() {
        Some(record) => println!(
            "  Oldest: {} (first seen {})",
            record.id,
            record.first_seen_at.to_rfc3339()
        ),
        None => println!("  Oldest: -"),
    }
    println!("Retention: {} day(s)", config.retention.days);
    println!(
        "Interval: {}s, fetch limit {}",
        config.sync.interval.as_secs(),
        config.sync.fetch_limit
    );
    match config.validate() {
        Ok(()) => println!("Credentials: complete"),
        Err(e) => println!("Credentials: {e}"),
    }

    Ok(())
}
