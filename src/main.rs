//! Sitemap-Indexer main entry point
//!
//! This is the command-line interface for submitting a site's sitemap URLs to
//! the indexing API.

use clap::Parser;
use sitemap_indexer::auth::{AuthFlow, CredentialStore, FileCredentialStore};
use sitemap_indexer::config::{load_config_with_hash, Config};
use sitemap_indexer::engine::{HttpIndexClient, SubmissionEngine};
use sitemap_indexer::http::build_http_client;
use sitemap_indexer::sitemap::SitemapLoader;
use sitemap_indexer::state::ResumeLedger;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Number of runs listed by --stats
const RECENT_RUNS: usize = 10;

/// Number of ledger URLs listed by --stats
const RECENT_ENTRIES: usize = 10;

/// Sitemap-Indexer: resumable sitemap submission to the indexing API
///
/// Reads every URL from a sitemap and notifies the indexing API about each
/// one, pacing requests and stopping at a daily limit. Submitted URLs are
/// recorded in a ledger so the next run picks up where this one stopped.
#[derive(Parser, Debug)]
#[command(name = "sitemap-indexer")]
#[command(version)]
#[command(about = "Resumable sitemap submission to the indexing API", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Load the sitemap and show what would be submitted, without submitting
    #[arg(long, conflicts_with_all = ["stats", "clear_credentials"])]
    dry_run: bool,

    /// Show ledger statistics and recent runs, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "clear_credentials"])]
    stats: bool,

    /// Delete the cached credential, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    clear_credentials: bool,

    /// Discard the cached credential and go through consent again
    #[arg(long)]
    reauth: bool,

    /// Override the number of leading sitemap URLs to ignore
    #[arg(long, value_name = "N")]
    start_offset: Option<usize>,

    /// Override the maximum number of submissions for this run
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    daily_limit: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The log file location comes from the config, so load it first
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    setup_logging(cli.verbose, cli.quiet, &config.output.log_path)?;
    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    if let Some(start_offset) = cli.start_offset {
        tracing::info!("Start offset overridden: {}", start_offset);
        config.run.start_offset = start_offset;
    }
    if let Some(daily_limit) = cli.daily_limit {
        tracing::info!("Daily limit overridden: {}", daily_limit);
        config.run.daily_limit = daily_limit;
    }

    if cli.stats {
        handle_stats(&config)
    } else if cli.clear_credentials {
        handle_clear_credentials(&config)
    } else if cli.dry_run {
        handle_dry_run(&config).await
    } else {
        handle_run(config, &config_hash, cli.reauth).await
    }
}

/// Sets up console logging based on verbosity, plus the append-only run log
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let console_filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitemap_indexer=info,warn"),
            1 => EnvFilter::new("sitemap_indexer=debug,info"),
            2 => EnvFilter::new("sitemap_indexer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_filter(console_filter);

    let file = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(log_file))
        .with_filter(EnvFilter::new("sitemap_indexer=info,warn"));

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();

    Ok(())
}

/// Handles the --stats mode: ledger size and run history
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use sitemap_indexer::output::{load_statistics, print_latest_entries, print_statistics};
    use sitemap_indexer::storage::open_storage;

    println!("Ledger: {}\n", config.output.ledger_path.display());

    let storage = open_storage(&config.output.ledger_path)?;
    let stats = load_statistics(&storage, RECENT_RUNS)?;
    print_statistics(&stats);

    let ledger = ResumeLedger::open(&config.output.ledger_path, config.run.operation)?;
    print_latest_entries(&ledger.entries()?, RECENT_ENTRIES);

    Ok(())
}

/// Handles the --clear-credentials mode
fn handle_clear_credentials(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileCredentialStore::new(&config.auth.credential_path, config.auth.scopes.clone());
    store.clear()?;
    println!("✓ Cached credential cleared: {}", store.path().display());
    Ok(())
}

/// Handles the --dry-run mode: sitemap, offset and ledger, but no auth and no submission
async fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use sitemap_indexer::output::{plan_dry_run, print_dry_run};

    let client = build_http_client(config.submission.request_timeout())?;
    let urls = SitemapLoader::new(client).load(&config.run.sitemap_url).await?;
    let ledger = ResumeLedger::open(&config.output.ledger_path, config.run.operation)?;

    print_dry_run(&plan_dry_run(&urls, &config.run, &ledger));
    Ok(())
}

/// Handles the main submission run
async fn handle_run(
    config: Config,
    config_hash: &str,
    reauth: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use sitemap_indexer::output::print_summary;

    tracing::info!(
        "Operation: {}, sitemap: {}, daily limit: {}, start offset: {}",
        config.run.operation,
        config.run.sitemap_url,
        config.run.daily_limit,
        config.run.start_offset
    );

    let client = build_http_client(config.submission.request_timeout())?;

    let mut auth = AuthFlow::new(&config.auth, client.clone())?;
    if reauth {
        auth.require_consent();
    }

    let ledger = ResumeLedger::open(&config.output.ledger_path, config.run.operation)?;
    tracing::info!("Ledger holds {} submitted URLs", ledger.len());

    let mut engine = SubmissionEngine::new(
        SitemapLoader::new(client.clone()),
        Box::new(auth),
        Box::new(HttpIndexClient::new(client, &config.submission.endpoint)),
        ledger,
        &config.submission,
    );

    tokio::select! {
        result = engine.run(&config, config_hash) => match result {
            Ok(summary) => {
                print_summary(&summary);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Run failed: {}", e);
                Err(e.into())
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; everything submitted so far is in the ledger");
            Err("interrupted".into())
        }
    }
}
