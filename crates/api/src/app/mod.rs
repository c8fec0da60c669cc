//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and marketplace construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: the response envelope, request extraction and shared payloads
//! - `errors.rs`: error classification and the error envelope

use axum::{Extension, Router, http::HeaderValue, http::Uri};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bazaar_infra::{Marketplace, ServiceError};

use crate::config::AppConfig;
use crate::middleware::AuthState;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Router, ServiceError> {
    let market = services::build_services(config).await?;
    Ok(router(market, config))
}

fn router(market: Marketplace, config: &AppConfig) -> Router {
    let auth = AuthState {
        market: market.clone(),
    };

    Router::new()
        .nest("/api", routes::router(auth))
        .fallback(not_found)
        .layer(Extension(market))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors(config)),
        )
}

fn cors(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match config
        .cors_origin
        .as_deref()
        .and_then(|o| HeaderValue::from_str(o).ok())
    {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

async fn not_found(uri: Uri) -> errors::ApiError {
    tracing::debug!(path = %uri.path(), "no route");
    errors::ApiError::NotFound("Route not found".to_string())
}
