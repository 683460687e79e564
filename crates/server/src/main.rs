mod api;
mod metrics;
mod poller;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pressroom_core::{
    create_authenticator, create_build_trigger, create_job_store, create_worker, load_config,
    validate_config, Authenticator, ContentStore, GistContentStore, JobProducer, ProducerMode,
    SiteHooks, WebhookTrigger,
};

use api::create_router;
use poller::QueuePoller;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PRESSROOM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Job store backend: {:?}", config.job_store.backend);
    info!("Producer mode: {:?}", config.producer.mode);

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Create job store
    let job_store = create_job_store(&config.job_store)
        .await
        .context("Failed to create job store")?;
    info!("Job store initialized: {}", job_store.backend_name());

    // Content store client
    let content_store: Arc<dyn ContentStore> = Arc::new(
        GistContentStore::new(&config.content_store)
            .context("Failed to create content store client")?,
    );
    if config.content_store.token.is_empty() {
        warn!("No content store token configured, content writes will be rejected upstream");
    }

    // Build trigger and site hooks
    let trigger = create_build_trigger(&config.trigger).context("Failed to create build trigger")?;
    match (&trigger, config.producer.mode) {
        (Some(t), ProducerMode::Live) => info!("Using build trigger: {}", t.name()),
        (None, ProducerMode::Live) if config.worker.embedded_poll_secs.is_none() => warn!(
            "Live mode without a build trigger or embedded poller; jobs wait for an external worker run"
        ),
        _ => {}
    }

    let site_hooks: Arc<dyn SiteHooks> = Arc::new(
        WebhookTrigger::new(
            config.trigger.deploy_webhook_url.clone(),
            config.trigger.preview_webhook_url.clone(),
        )
        .context("Failed to create site webhooks")?,
    );

    let producer = JobProducer::new(Arc::clone(&job_store), trigger, config.producer.clone());

    // Embedded fallback poller
    let poller = match config.worker.embedded_poll_secs {
        Some(secs) if config.producer.mode == ProducerMode::Live => {
            let worker = create_worker(&config, Arc::clone(&job_store))
                .context("Failed to create embedded worker")?;
            let poller = Arc::new(QueuePoller::new(
                Arc::new(worker),
                Duration::from_secs(secs.max(1)),
            ));
            poller.start().await;
            Some(poller)
        }
        Some(_) => {
            info!("Simulated mode, embedded poller disabled");
            None
        }
        None => None,
    };

    // Create app state
    let mut state = AppState::new(
        config.clone(),
        authenticator,
        job_store,
        producer,
        content_store,
        site_hooks,
    );
    if let Some(ref poller) = poller {
        state = state.with_poller(Arc::clone(poller));
    }

    // Create router
    let app = create_router(Arc::new(state));

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    if let Some(poller) = poller {
        info!("Stopping queue poller...");
        poller.stop().await;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
}
