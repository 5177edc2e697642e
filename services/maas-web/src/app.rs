//! HTTP routes
//!
//! Endpoints:
//! - POST /chatbot             : chat assistant, `{"message"}` → `{"response"}`
//! - GET|POST /farmer          : location-aware advice + schemes + mock tx
//! - GET|POST /buyer           : market placeholder + cooperative directory + mock tx
//! - GET|POST /consumer        : meal-plan placeholder + mock tx
//! - POST /analyze_image       : multipart upload, simulated pest analysis
//! - GET  /products/manage       : catalog, newest first
//! - POST /products/add          : create a listing
//! - GET|POST /products/edit/{id}: fetch or update a listing
//! - POST /products/delete/{id}  : remove a listing
//! - GET  /schemes, /directory, /ledger/tx: simulated static data
//! - GET  /health, /metrics    : service health and Prometheus exposition
//!
//! Page rendering is not done here: dashboards return the data a page would
//! show, AI text already rendered to HTML.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use ai_gateway::AiGateway;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Form, MatchedPath, Multipart, Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tracing::{Instrument, debug, info, info_span};

use crate::catalog::{Product, ProductForm, ProductStore};
use crate::error::ApiError;
use crate::prompts;
use crate::simulated;
use crate::upload::secure_filename;

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<AiGateway>,
    pub catalog: Arc<dyn ProductStore>,
    pub stats: ServiceStats,
    pub prometheus: PrometheusHandle,
}

/// Counters reported by the health endpoint
#[derive(Debug, Clone)]
pub struct ServiceStats {
    pub requests_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

/// Build the axum router with all routes and shared state.
///
/// `max_connections` caps in-flight requests across all routes, which also
/// bounds how many generation loops run at once.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/chatbot", post(chatbot))
        .route("/farmer", get(farmer).post(farmer))
        .route("/buyer", get(buyer).post(buyer))
        .route("/consumer", get(consumer).post(consumer))
        .route("/analyze_image", post(analyze_image))
        .route("/products/manage", get(manage_products))
        .route("/products/add", post(add_product))
        .route("/products/edit/{id}", get(get_product).post(edit_product))
        .route("/products/delete/{id}", post(delete_product))
        .route("/schemes", get(schemes))
        .route("/directory", get(directory))
        .route("/ledger/tx", get(ledger_tx))
        .layer(middleware::from_fn_with_state(state.clone(), track_request))
        .layer(tower::limit::GlobalConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Per-request id span, request counter and latency metrics.
async fn track_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.stats.requests_total.fetch_add(1, Ordering::Relaxed);

    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let span = info_span!("request", %request_id, %method, %route);

    let started = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;
    let elapsed = started.elapsed().as_secs_f64();

    let status = response.status().as_u16();
    crate::metrics::record_request(status, &method, &route, elapsed);
    span.in_scope(|| debug!(status, elapsed_secs = elapsed, "request complete"));
    response
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

/// POST /chatbot: answer a free-form question as the millet assistant.
async fn chatbot(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Json<serde_json::Value> {
    let response = state
        .gateway
        .generate(&prompts::chatbot(&request.message))
        .await;
    Json(serde_json::json!({ "response": response }))
}

/// Coordinates posted by the dashboards' location form.
#[derive(Debug, Default, Deserialize)]
struct LocationForm {
    latitude: Option<String>,
    longitude: Option<String>,
}

/// GET|POST /farmer: advisory text for the farmer's coordinates.
///
/// Without a latitude no AI call is made and a static hint is returned.
async fn farmer(State(state): State<AppState>, Form(location): Form<LocationForm>) -> Json<serde_json::Value> {
    let latitude = location
        .latitude
        .as_deref()
        .map(str::trim)
        .filter(|lat| !lat.is_empty());

    let ai_advisor = match latitude {
        Some(lat) => {
            let lon = location.longitude.as_deref().map(str::trim).unwrap_or("unknown");
            state
                .gateway
                .generate(&prompts::farm_advisor(lat, lon))
                .await
        }
        None => prompts::ENABLE_LOCATION_ADVICE.to_string(),
    };

    Json(serde_json::json!({
        "marketplace_items": state.catalog.list(),
        "ai_advisor": ai_advisor,
        "blockchain_tx": simulated::dummy_ledger_tx(),
        "govt_schemes": simulated::govt_schemes(),
    }))
}

/// GET|POST /buyer
async fn buyer(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "marketplace_items": state.catalog.list(),
        "market_intel": prompts::ENABLE_LOCATION_INTEL,
        "blockchain_tx": simulated::dummy_ledger_tx(),
        "shg_fpo_directory": simulated::shg_fpo_directory(),
    }))
}

/// GET|POST /consumer
async fn consumer(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "marketplace_items": state.catalog.list(),
        "nutrition_plan": prompts::ENABLE_LOCATION_MEAL_PLAN,
        "blockchain_tx": simulated::dummy_ledger_tx(),
    }))
}

/// POST /analyze_image: accept a plant photo and return a simulated diagnosis.
///
/// The image is read and discarded; only its sanitized name is echoed back.
async fn analyze_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::Upload(e.body_text()))?;
    let mut file_name = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = secure_filename(field.file_name().unwrap_or_default());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Upload(e.to_string()))?;
        debug!(file_name = %name, size = bytes.len(), "image received");
        file_name = Some(name);
        break;
    }

    let file_name = file_name.ok_or(ApiError::MissingFile)?;
    let ai_result = state.gateway.generate(&prompts::plant_pathologist()).await;

    Ok(Json(serde_json::json!({
        "status": "success",
        "fileName": file_name,
        "ai_result": ai_result,
    })))
}

/// GET /products/manage
async fn manage_products(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "products": state.catalog.list() }))
}

/// POST /products/add
async fn add_product(
    State(state): State<AppState>,
    Form(form): Form<ProductForm>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let product = state.catalog.insert(form.validate()?);
    info!(product_id = product.id, title = %product.title, "product added");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "message": "Product added successfully!",
            "product": product,
        })),
    ))
}

/// GET /products/edit/{id}
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Product>, ApiError> {
    state
        .catalog
        .get(id)
        .map(Json)
        .ok_or(ApiError::ProductNotFound(id))
}

/// POST /products/edit/{id}
async fn edit_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Form(form): Form<ProductForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let draft = form.validate()?;
    let product = state
        .catalog
        .update(id, draft)
        .ok_or(ApiError::ProductNotFound(id))?;
    info!(product_id = id, "product updated");
    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Product updated successfully!",
        "product": product,
    })))
}

/// POST /products/delete/{id}
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.catalog.delete(id) {
        return Err(ApiError::ProductNotFound(id));
    }
    info!(product_id = id, "product deleted");
    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Product deleted successfully!",
    })))
}

async fn schemes() -> Json<Vec<simulated::Scheme>> {
    Json(simulated::govt_schemes())
}

async fn directory() -> Json<Vec<simulated::Cooperative>> {
    Json(simulated::shg_fpo_directory())
}

async fn ledger_tx() -> Json<simulated::LedgerTx> {
    Json(simulated::dummy_ledger_tx())
}

/// Health endpoint: uptime, requests served and key pool health.
/// Returns 503 when no key in the pool is usable.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let pool = state.gateway.pool().health();
    let pool_status = pool["status"].as_str().unwrap_or("unhealthy").to_string();
    let status_code = if pool_status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let body = serde_json::json!({
        "status": pool_status,
        "uptime_seconds": state.stats.started_at.elapsed().as_secs(),
        "requests_served": state.stats.requests_total.load(Ordering::Relaxed),
        "pool": pool,
    });

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint: text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}
