//! ktv-search - Karaoke catalog search aggregator
//!
//! Runs either as an HTTP service (`serve`, the default) or as a one-shot
//! search that writes the aggregated songs as JSON (`search`). Given several
//! keywords, a keywords file or `--hot-singers`, `search` runs them as a
//! paced batch and writes `{ keyword: [songs] }`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ktv_common::config::{load_config, resolve_config_path, TomlConfig};
use ktv_common::SearchType;
use ktv_search::logging::{apply_configured_level, init_tracing};
use ktv_search::search::{collect_keywords, run_batch, EngineSettings, SearchEngine};
use ktv_search::services::CatalogClient;
use ktv_search::sink::{JsonSink, SongSink};
use ktv_search::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};

/// Command-line arguments for ktv-search
#[derive(Parser, Debug)]
#[command(name = "ktv-search")]
#[command(about = "Aggregated karaoke song search across vendor catalogs")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Search one or more keywords and write the songs as JSON
    Search {
        /// Song titles or singers to look for
        keywords: Vec<String>,

        /// Read further keywords from FILE, one per line
        #[arg(long, value_name = "FILE")]
        keywords_file: Option<PathBuf>,

        /// Append the built-in popular singer list
        #[arg(long)]
        hot_singers: bool,

        /// song, singer or auto
        #[arg(short = 't', long = "type", default_value = "auto")]
        search_type: String,

        /// Pause between batch keywords (default: upstream.batch_pause_ms)
        #[arg(long, value_name = "MS")]
        pause_ms: Option<u64>,

        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so `search` output on stdout stays clean JSON
    let log_handle = init_tracing();
    info!("Starting ktv-search v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;
    let env_override = std::env::var_os("RUST_LOG").is_some();
    apply_configured_level(&log_handle, &config.logging.level, env_override)
        .context("Failed to apply configured log level")?;
    match resolve_config_path(args.config.as_deref()) {
        Some(path) if path.exists() => info!("Configuration: {}", path.display()),
        _ => info!("Configuration: built-in defaults"),
    }

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(&config).await
        }
        Command::Search {
            keywords,
            keywords_file,
            hot_singers,
            search_type,
            pause_ms,
            output,
        } => {
            let batch = keywords.len() > 1 || keywords_file.is_some() || hot_singers;
            let keywords = collect_keywords(&keywords, keywords_file.as_deref(), hot_singers)?;
            let search_type: SearchType = search_type.parse()?;
            let mut sink = JsonSink::from_option(output);

            if batch {
                let pause =
                    Duration::from_millis(pause_ms.unwrap_or(config.upstream.batch_pause_ms));
                search_batch(&config, &keywords, search_type, pause, &mut sink).await
            } else {
                search_once(&config, &keywords[0], search_type, &mut sink).await
            }
        }
    }
}

fn build_engine(config: &TomlConfig) -> Result<Arc<SearchEngine>> {
    let client =
        CatalogClient::new(&config.upstream).context("Failed to build catalog HTTP client")?;
    info!("Catalog endpoint: {}", client.endpoint_url());

    let settings = EngineSettings::from_config(&config.upstream);
    info!(
        companies = settings.companies.len(),
        concurrency = settings.max_concurrency,
        interval_ms = settings.request_interval.as_millis() as u64,
        deadline_ms = settings.search_deadline.as_millis() as u64,
        "Fan-out policy"
    );
    if config.upstream.catch_all_only {
        warn!("catch_all_only enabled: per-vendor requests are skipped");
    }

    Ok(Arc::new(SearchEngine::new(Arc::new(client), settings)))
}

async fn serve(config: &TomlConfig) -> Result<()> {
    let engine = build_engine(config)?;
    let app = build_router(AppState::new(engine));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn search_once(
    config: &TomlConfig,
    keyword: &str,
    search_type: SearchType,
    sink: &mut dyn SongSink,
) -> Result<()> {
    let engine = build_engine(config)?;

    let outcome = engine.search(keyword, search_type).await?;
    if outcome.partial {
        warn!(
            "Search deadline reached; {} of {} requests did not finish",
            outcome.stats.requests_skipped, outcome.stats.requests_planned
        );
    }

    sink.write_songs(&outcome.songs)
        .context("Failed to write search results")?;
    Ok(())
}

async fn search_batch(
    config: &TomlConfig,
    keywords: &[String],
    search_type: SearchType,
    pause: Duration,
    sink: &mut dyn SongSink,
) -> Result<()> {
    let engine = build_engine(config)?;

    let result = run_batch(&engine, keywords, search_type, pause).await;
    if !result.failed.is_empty() {
        warn!("Keywords that failed: {}", result.failed.join(", "));
    }

    sink.write_batch(&result)
        .context("Failed to write batch results")?;
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
