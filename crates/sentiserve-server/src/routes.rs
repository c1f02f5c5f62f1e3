//! HTTP routes and handlers

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sentiserve_core::{ModelDescriptor, PredictionRequest, PredictionResponse};
use sentiserve_telemetry::sink::names;
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::security::require_token;
use crate::state::AppState;

/// Upper bound on request bodies
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/models", get(list_models))
        .route(
            "/predict",
            post(predict).route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_token,
            )),
        )
        .route("/health", get(api_health));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .nest(&state.config.api_prefix, api)
        .route_layer(middleware::from_fn(track_metrics))
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics exporter not installed").into_response(),
    }
}

#[derive(Debug, Serialize)]
struct ModelsResponse {
    total: usize,
    models: Vec<ModelDescriptor>,
}

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let models = state.dispatcher.list_models().to_vec();
    Json(ModelsResponse {
        total: models.len(),
        models,
    })
}

async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionResponse>, ApiError> {
    if request.texts.is_empty() {
        return Err(ApiError::Unprocessable(
            "texts must contain at least one item".to_string(),
        ));
    }
    if request.texts.len() > state.config.max_batch_size {
        return Err(ApiError::Unprocessable(format!(
            "texts must contain at most {} items, got {}",
            state.config.max_batch_size,
            request.texts.len()
        )));
    }

    debug!(
        request_id = %request.id,
        items = request.texts.len(),
        model_version = ?request.model_version,
        "Prediction request"
    );

    let response = state.dispatcher.predict(request).await;

    info!(
        request_id = %response.request_id,
        version = %response.model_version,
        items = response.results.len(),
        cached = response.cached,
        latency_ms = response.latency_ms,
        "Prediction served"
    );

    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    active_models: Vec<String>,
}

async fn api_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "active",
        active_models: state.dispatcher.loader().loaded_versions().await,
    })
}

async fn fallback() -> ApiError {
    ApiError::NotFound
}

/// Record request count and latency per matched route
async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    ::metrics::counter!(
        names::HTTP_REQUESTS,
        "method" => method.clone(),
        "endpoint" => endpoint.clone(),
        "status" => status
    )
    .increment(1);
    ::metrics::histogram!(
        names::HTTP_REQUEST_DURATION,
        "method" => method,
        "endpoint" => endpoint
    )
    .record(start.elapsed().as_secs_f64());

    response
}

/// Error handling
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Unprocessable(String),
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "Invalid or missing auth token".to_string(),
            ),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_request_error", msg)
            }
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "Not found".to_string(),
            ),
        };

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
