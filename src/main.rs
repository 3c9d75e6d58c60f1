//! Static Tiles - an HTTP server for pre-rendered image tiles.
//!
//! This binary starts the HTTP server and configures all components.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use static_tiles::{
    access::{AccessSink, FileSink, TracingSink},
    config::Config,
    policy::Negotiator,
    resource::RootDir,
    server::{create_router, RouterConfig},
    AssetService,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    run_serve(config).await
}

// =============================================================================
// Serve
// =============================================================================

async fn run_serve(config: Config) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let rules = match config.route_table() {
        Ok(rules) => rules,
        Err(e) => {
            error!("Route rule error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let root = match RootDir::open(&config.root) {
        Ok(root) => root,
        Err(e) => {
            error!("Cannot open root {}: {}", config.root.display(), e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  Root: {}", root.path().display());
    for rule in rules.rules() {
        info!(
            "  Rule '{}' (precedence {}): {:?}, {}, listing {}",
            rule.name,
            rule.precedence,
            rule.matcher,
            rule.policy.cache.header_value(),
            if rule.policy.listing { "on" } else { "off" }
        );
    }
    let compression = config.compression();
    if compression.enabled {
        info!(
            "  gzip: level {}, min {} bytes, {} types",
            compression.level,
            compression.min_size,
            compression.mime_types.len()
        );
    } else {
        warn!("  gzip: disabled");
    }

    let access_sink: Arc<dyn AccessSink> = match &config.access_log {
        Some(path) => match FileSink::open(path).await {
            Ok(sink) => {
                info!("  Access log: {}", path.display());
                Arc::new(sink)
            }
            Err(e) => {
                error!("Cannot open access log {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("  Access log: tracing target 'access_log'");
            Arc::new(TracingSink)
        }
    };

    let assets = AssetService::new(root, rules, Negotiator::new(compression));
    let router = create_router(assets, build_router_config(&config, access_sink));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  curl http://{}/health", addr);

    let result = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    if let Err(e) = result {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "static_tiles=debug,tower_http=debug,access_log=info"
    } else {
        "static_tiles=info,tower_http=info,access_log=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config, access_sink: Arc<dyn AccessSink>) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_access_sink(access_sink);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
