use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::API_VERSION;
use crate::service::{ConfigContext, ConfigSnapshot};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub api_version: &'static str,
    pub status_code: u16,
    pub service_name: String,
    pub config: ConfigSnapshot,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResponse {
    pub api_version: &'static str,
    pub version: &'static str,
}

pub async fn get_config(State(ctx): State<Arc<ConfigContext>>) -> Result<Json<ConfigResponse>, StatusCode> {
    let config = ctx.snapshot().map_err(|e| {
        tracing::error!(error = %e, "Unable to build configuration snapshot");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ConfigResponse {
        api_version: API_VERSION,
        status_code: StatusCode::OK.as_u16(),
        service_name: ctx.service_name().to_string(),
        config,
    }))
}

pub async fn get_ping() -> Json<PingResponse> {
    Json(PingResponse {
        api_version: API_VERSION,
        version: env!("CARGO_PKG_VERSION"),
    })
}
