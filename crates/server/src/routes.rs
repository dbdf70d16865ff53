//! HTTP surface of the recommendation service.
//!
//! - `POST /recommend` with `{"user_id": ..., "limit"?: n}` returns a JSON
//!   array of similar users' row indices
//! - `GET /health` reports liveness and the model's user count

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::service::{RecommendationService, ServiceError, UserKey};
use similarity::SimilarityError;

/// Body of `POST /recommend`
#[derive(Debug, Deserialize, Serialize)]
pub struct RecommendRequest {
    pub user_id: UserKey,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    users: usize,
}

/// Errors returned by the handlers
#[derive(Debug)]
pub enum ApiError {
    /// Body is not valid JSON or lacks `user_id`
    BadRequest(String),
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(err) => match err {
                ServiceError::UnknownUser(_) | ServiceError::InvalidUserKey(_) => {
                    StatusCode::BAD_REQUEST
                }
                ServiceError::Model(SimilarityError::InvalidIndex { .. }) => StatusCode::BAD_REQUEST,
                ServiceError::Model(SimilarityError::EmptyModel) => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Service(err) => err.to_string(),
        };

        if status.is_server_error() {
            warn!("Request failed: {}", message);
        }

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

/// Build the application router around a shared service
pub fn router(service: RecommendationService) -> Router {
    Router::new()
        .route("/recommend", post(recommend))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(service))
}

async fn recommend(
    State(service): State<Arc<RecommendationService>>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<Vec<usize>>, ApiError> {
    let Json(request) = payload?;
    let indices = service.recommend(&request.user_id, request.limit)?;
    Ok(Json(indices))
}

async fn health(State(service): State<Arc<RecommendationService>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        users: service.model().user_count(),
    })
}

/// Bind the listener and serve until Ctrl+C
pub async fn serve(config: &ServerConfig, service: RecommendationService) -> Result<()> {
    let address = config.address();
    let users = service.model().user_count();

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("Serving {} users on http://{}", users, address);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
