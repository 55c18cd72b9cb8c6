pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use self::handlers::*;
use crate::service::ConfigContext;

pub const API_VERSION: &str = "v2";

pub fn setup_admin_router(ctx: Arc<ConfigContext>) -> Router {
    Router::new()
        .route("/api/v2/config", get(get_config))
        .route("/api/v2/ping", get(get_ping))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
