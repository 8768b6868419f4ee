//! Sidebet Relayer HTTP entrypoint.
//!
//! This binary launches the HTTP API, connects to Postgres and the
//! settlement chain, and spawns the background scheduler driving the four
//! reconcilers described in the design.
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `HOST`, `PORT` control binding address
//! - see `config::Config` for the full environment surface

use sidebet_relayer::chain::EvmChainGateway;
use sidebet_relayer::config::Config;
use sidebet_relayer::finalization_service::FinalizationService;
use sidebet_relayer::http::{self, AppState};
use sidebet_relayer::scheduler::Scheduler;
use sidebet_relayer::signature_service::SignatureService;
use sidebet_relayer::store::PostgresStore;
use sidebet_relayer::sync_service::SyncService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!(chain_id = config.chain_id, "starting sidebet-relayer");

    let store: Arc<dyn sidebet_relayer::store::Store> =
        Arc::new(PostgresStore::connect(&config.database_url).await?);

    let chain = EvmChainGateway::connect(&config).await?;
    let relayer_address = chain.relayer_address();
    let chain: Arc<dyn sidebet_relayer::chain::ChainGateway> = Arc::new(chain);

    let sync = Arc::new(SyncService::new(
        store.clone(),
        chain.clone(),
        config.market_stale_after_secs,
    ));
    let signatures = Arc::new(SignatureService::new(
        store.clone(),
        chain.clone(),
        sync.clone(),
        &config,
    ));
    let finalization = Arc::new(FinalizationService::new(
        store.clone(),
        chain.clone(),
        sync.clone(),
        config.min_signatures_threshold,
        config.max_proposal_age_hours,
    ));

    let config = Arc::new(config);

    let scheduler = Arc::new(Scheduler::new(
        sync.clone(),
        finalization.clone(),
        store.clone(),
        &config,
    ));

    let cancel = sidebet_relayer::shutdown::install()?;
    scheduler.spawn_all(cancel.clone());

    let rate_limiter = http::rate_limiter(config.rate_limit_window_ms, config.rate_limit_max_requests);

    let app_state = Arc::new(AppState {
        store,
        chain,
        signatures,
        sync,
        config: config.clone(),
        rate_limiter,
        started_at: Instant::now(),
        relayer_address,
    });

    let app = http::router(app_state);
    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(%addr, "binding http listener");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let serve_cancel = cancel.clone();
    let select_cancel = cancel;
    let grace = Duration::from_secs(config.shutdown_grace_secs);

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { serve_cancel.cancelled().await })
    .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = select_cancel.cancelled() => {
            tracing::info!(grace_secs = grace.as_secs(), "draining in-flight requests");
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result?,
                Err(_) => tracing::warn!("shutdown grace period exceeded, exiting unconditionally"),
            }
        }
    }

    Ok(())
}
