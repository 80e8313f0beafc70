//! snapclass-ui - Image classifier web front-end
//!
//! Startup order:
//! 1. Bootstrap config (CLI > environment > TOML > defaults)
//! 2. Tracing, then build identification
//! 3. Root folder, content registry, model provider
//! 4. Background model warm-up; the server keeps running if it fails

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use snapclass_common::config::{
    find_config_file, load_or_default, resolve_against, RootFolderInitializer,
    RootFolderResolver,
};
use snapclass_common::ContentRegistry;
use snapclass_ui::classifier::StaticClassifier;
use snapclass_ui::fetch::ModelFetcher;
use snapclass_ui::provider::ModelProvider;
use snapclass_ui::{build_router, logging, AppState};

/// Command-line arguments for snapclass-ui
#[derive(Parser, Debug)]
#[command(name = "snapclass-ui")]
#[command(about = "Web front-end for an image classifier with per-label content")]
#[command(version)]
struct Args {
    /// Bootstrap config file (default: search SNAPCLASS_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root folder for the model, vocabulary and content files
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "SNAPCLASS_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SNAPCLASS_PORT")]
    port: Option<u16>,

    /// Content registry TOML file (relative paths resolve against the working directory)
    #[arg(long, env = "SNAPCLASS_CONTENT")]
    content: Option<PathBuf>,

    /// Serve without a model, using fixed probabilities over the registry labels
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = find_config_file(args.config.as_deref());
    let mut config = load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(content) = args.content {
        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        config.content.path = Some(resolve_against(&cwd, &content));
    }

    logging::init_tracing(&config.logging)?;

    info!(
        "Starting SnapClass UI (snapclass-ui) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => warn!("No configuration file found, using built-in defaults"),
    }

    let resolver = RootFolderResolver::new(args.root_folder, config.root_folder.clone());
    let initializer = RootFolderInitializer::new(resolver.resolve());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let registry = match &config.content.path {
        Some(path) => ContentRegistry::load(&initializer.resolve_path(path))?,
        None => {
            info!("No content registry configured, using the embedded sample");
            ContentRegistry::embedded_default()?
        }
    };

    let model = if args.demo {
        let labels: Vec<String> = registry.labels().into_iter().map(str::to_string).collect();
        info!("Demo mode: fixed probabilities over {} labels", labels.len());
        let classifier = StaticClassifier::demo(labels)
            .context("Demo mode needs at least one content registry label")?;
        ModelProvider::ready(Arc::new(classifier))
    } else {
        let model_path = initializer.resolve_path(&config.model.path);
        let labels_path = initializer.resolve_path(&config.model.labels_path);
        info!("Model: {}", model_path.display());
        info!("Vocabulary: {}", labels_path.display());
        ModelProvider::onnx(
            ModelFetcher::new().context("Failed to create HTTP client")?,
            config.model.source_url(),
            model_path,
            labels_path,
            config.model.clone(),
        )
    };

    let state = AppState::new(
        registry,
        model,
        &config.session,
        config.server.max_upload_bytes,
    );
    tokio::spawn(warm_up(state.clone()));

    let app = build_router(state);

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

/// Load the model before the first request needs it
async fn warm_up(state: AppState) {
    match state.model.get().await {
        Ok(classifier) => {
            info!("✓ Model ready ({} labels)", classifier.vocab().len());
            state.registry.labels_missing_from(classifier.vocab());
        }
        Err(e) => {
            error!("Model warm-up failed, will retry on first classification: {}", e);
            *state.last_error.write().await = Some(e.to_string());
        }
    }
}

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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
