use axum::{extract::State, response::Json, routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use edgescan_backend::cache::CacheLayer;
use edgescan_backend::config::AppConfig;
use edgescan_backend::jobs::{
    HttpInterpreter, InterpretationJob, OnchainActivitySource, Orchestrator, ScanJob, ScoringJob,
    SnapshotJob, WalletIntelJob,
};
use edgescan_backend::pipeline::Ingestor;
use edgescan_backend::providers::{
    BirdeyeProvider, DexScreenerProvider, FetcherConfig, GeckoTerminalProvider, MockProvider,
    MultiSourceFetcher, RateLimitGuard, TokenProvider,
};
use edgescan_backend::storage::{MarketStore, TokenRepository, TokenStore};

#[derive(Clone)]
struct AppState {
    repository: Arc<TokenRepository>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    info!("Starting edgescan backend");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    info!("Connected to Postgres");

    let cache = CacheLayer::new(&config.redis_url)?;

    // One guard instance shared by the primary provider, the fetcher and
    // the snapshot job, so a 429 anywhere cools everything down together.
    let guard = Arc::new(RateLimitGuard::new(Duration::from_secs(60)));
    if config.birdeye_api_key.is_none() {
        warn!("No primary provider key configured, relying on fallbacks");
    }

    let primary: Arc<dyn TokenProvider> = Arc::new(BirdeyeProvider::new(
        config.birdeye_api_key.clone(),
        Arc::clone(&guard),
    ));
    let fallbacks: Vec<Arc<dyn TokenProvider>> = vec![
        Arc::new(GeckoTerminalProvider::new()),
        Arc::new(DexScreenerProvider::new()),
        Arc::new(MockProvider),
    ];
    let fetcher = Arc::new(MultiSourceFetcher::new(
        primary,
        fallbacks,
        guard,
        FetcherConfig::default(),
    ));

    let repository = Arc::new(TokenRepository::new(pool));
    let ingestor = Arc::new(Ingestor::new(
        Arc::clone(&repository) as Arc<dyn MarketStore>,
        config.ingest_batch_size,
    ));

    let mut orchestrator = Orchestrator::new(Duration::from_secs(config.job_lock_secs));
    orchestrator.register(Arc::new(ScanJob::new(
        Arc::clone(&fetcher),
        ingestor,
        config.thresholds.clone(),
        Duration::from_secs(config.ingestion_interval_secs),
    )));
    orchestrator.register(Arc::new(SnapshotJob::new(
        Arc::clone(&fetcher),
        Arc::clone(&repository) as Arc<dyn TokenStore>,
        Duration::from_secs(config.snapshot_interval_secs),
    )));
    orchestrator.register(Arc::new(ScoringJob::new(
        Arc::clone(&repository) as Arc<dyn TokenStore>,
        cache.clone(),
        Duration::from_secs(config.scoring_interval_secs),
    )));

    match &config.onchain_api_key {
        Some(key) => {
            orchestrator.register(Arc::new(WalletIntelJob::new(
                Arc::new(OnchainActivitySource::new(key.clone())),
                Arc::clone(&repository) as Arc<dyn TokenStore>,
                Duration::from_secs(config.wallet_intel_interval_secs),
            )));
        }
        None => info!("No on-chain key configured, wallet intelligence disabled"),
    }

    match &config.ai_api_key {
        Some(key) => {
            orchestrator.register(Arc::new(InterpretationJob::new(
                Arc::new(HttpInterpreter::new(key.clone())),
                Arc::clone(&repository) as Arc<dyn TokenStore>,
                Duration::from_secs(config.interpretation_interval_secs),
            )));
        }
        None => info!("No AI key configured, interpretation disabled"),
    }

    orchestrator.start().await;
    let orchestrator = Arc::new(orchestrator);

    let state = AppState {
        repository: Arc::clone(&repository),
    };
    let app = Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.http_bind).await?;
    info!("Listening on {}", config.http_bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown signal received, draining queues");
    orchestrator.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let token_count = state.repository.token_count().await.unwrap_or(-1);
    Json(serde_json::json!({
        "status": "running",
        "tokens_tracked": token_count,
    }))
}
