//! HTTP routes
//!
//! Every calculator answers `POST /calculate[/...]` with its bare result
//! object; warnings from the envelope are logged, not returned.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use simulpret_core::api::{
    CapacityRequest, CapacityResponse, InvestmentRequest, InvestmentResponse, MultiOfferRequest,
    MultiOfferResponse, OptimizationRequest, OptimizationResponse, ScheduleRequest,
    ScheduleResponse, StressTestRequest, StressTestResponse, VariableRateRequest,
    VariableRateResponse,
};
use simulpret_core::bank_rates::{self, AlertEvaluation, RateAlert};
use simulpret_core::ComputationOutput;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{AppState, ServerError};

type Payload<T> = Result<Json<T>, JsonRejection>;

/// Origin of the web front-end's development server.
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:8080";

/// Create the application router
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/calculate", post(capacity))
        .route("/calculate/schedule", post(schedule))
        .route("/calculate/variable-rate", post(variable_rate))
        .route("/calculate/optimization", post(optimization))
        .route("/calculate/investment", post(investment))
        .route("/calculate/stress-test", post(stress_test))
        .route("/calculate/multi-offer", post(multi_offer))
        .route("/bank-rates", get(list_bank_rates))
        .route("/bank-rates/alerts", post(rate_alerts))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_origins))
        .with_state(state)
}

/// Build the CORS layer from configured origins. `"*"` allows any origin.
/// Unparseable origins are skipped; with none left only the local front-end
/// is allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.iter().any(|origin| origin.trim() == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let mut allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Invalid CORS origin, skipping");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        allowed.push(HeaderValue::from_static(DEFAULT_CORS_ORIGIN));
    }

    layer.allow_origin(AllowOrigin::list(allowed))
}

fn respond<T: Serialize>(calculator: &'static str, output: ComputationOutput<T>) -> Json<T> {
    for warning in &output.warnings {
        tracing::info!(calculator, warning = %warning, "calculation warning");
    }
    tracing::debug!(
        calculator,
        elapsed_us = output.metadata.computation_time_us,
        "calculation complete"
    );
    Json(output.result)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn capacity(
    State(state): State<AppState>,
    payload: Payload<CapacityRequest>,
) -> Result<Json<CapacityResponse>, ServerError> {
    let Json(request) = payload?;
    Ok(respond("capacity", request.run(&state.policy)?))
}

async fn schedule(
    State(state): State<AppState>,
    payload: Payload<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, ServerError> {
    let Json(request) = payload?;
    Ok(respond("schedule", request.run(&state.policy)?))
}

async fn variable_rate(
    State(state): State<AppState>,
    payload: Payload<VariableRateRequest>,
) -> Result<Json<VariableRateResponse>, ServerError> {
    let Json(request) = payload?;
    Ok(respond("variable-rate", request.run(&state.policy)?))
}

async fn optimization(
    State(state): State<AppState>,
    payload: Payload<OptimizationRequest>,
) -> Result<Json<OptimizationResponse>, ServerError> {
    let Json(request) = payload?;
    Ok(respond("optimization", request.run(&state.policy)?))
}

async fn investment(
    State(state): State<AppState>,
    payload: Payload<InvestmentRequest>,
) -> Result<Json<InvestmentResponse>, ServerError> {
    let Json(request) = payload?;
    Ok(respond("investment", request.run(&state.policy)?))
}

async fn stress_test(
    State(state): State<AppState>,
    payload: Payload<StressTestRequest>,
) -> Result<Json<StressTestResponse>, ServerError> {
    let Json(request) = payload?;
    Ok(respond("stress-test", request.run(&state.policy)?))
}

async fn multi_offer(
    State(state): State<AppState>,
    payload: Payload<MultiOfferRequest>,
) -> Result<Json<MultiOfferResponse>, ServerError> {
    let Json(request) = payload?;
    Ok(respond("multi-offer", request.run(&state.policy)?))
}

async fn list_bank_rates(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "rates": state.bank_rates.rates }))
}

async fn rate_alerts(
    State(state): State<AppState>,
    payload: Payload<Vec<RateAlert>>,
) -> Result<Json<Vec<AlertEvaluation>>, ServerError> {
    let Json(alerts) = payload?;
    Ok(Json(bank_rates::evaluate_alerts(&state.bank_rates, &alerts)))
}
