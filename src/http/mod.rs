//! HTTP API: thin routing and validation over the Signature, Sync, and
//! Store layers.

mod handlers;
mod rate_limit;

pub use rate_limit::RateLimiter;

use crate::chain::ChainGateway;
use crate::config::Config;
use crate::signature_service::SignatureService;
use crate::store::Store;
use crate::sync_service::SyncService;
use axum::Router;
use axum::http::Method;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub chain: Arc<dyn ChainGateway>,
    pub signatures: Arc<SignatureService>,
    pub sync: Arc<SyncService>,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimiter,
    pub started_at: Instant,
    pub relayer_address: alloy_primitives::Address,
}

pub fn rate_limiter(window_ms: u64, default_max_requests: u32) -> RateLimiter {
    RateLimiter::new(window_ms, default_max_requests)
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = build_cors(&state.config);
    Router::new()
        .merge(handlers::routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn build_cors(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([
        Method::GET,
        Method::POST,
        Method::DELETE,
        Method::OPTIONS,
    ]);
    if config.allowed_origins.is_empty() {
        layer.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
