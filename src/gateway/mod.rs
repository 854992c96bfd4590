//! HTTP gateway (Axum) exposing resolution and bank status.
//!
//! | Route                | Purpose                                   |
//! |----------------------|-------------------------------------------|
//! | `GET /healthz`       | liveness                                  |
//! | `GET /ready`         | current bank generation, 503 until loaded |
//! | `GET /ask`           | `?q=`, `?query=` or `?question=`          |
//! | `POST /ask`          | JSON `{"q": ...}` (same aliases)          |
//! | `POST /bank/refresh` | reload the bank now                       |

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::{ask_get_handler, ask_post_handler, refresh_handler};
pub use state::HandlerState;

use crate::bank::{Bank, EntryFetcher, SemanticStatus};
use crate::embedding::Embedder;
use crate::pipeline::StageKind;

pub fn create_router_with_state<F, E>(state: HandlerState<F, E>) -> Router
where
    F: EntryFetcher + 'static,
    E: Embedder + 'static,
{
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler::<F, E>))
        .route(
            "/ask",
            get(ask_get_handler::<F, E>).post(ask_post_handler::<F, E>),
        )
        .route("/bank/refresh", post(refresh_handler::<F, E>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Operator view of one bank generation.
#[derive(Debug, Serialize)]
pub struct BankSummary {
    pub generation: u64,
    pub entries: usize,
    pub skipped_rows: usize,
    pub fingerprint: String,
    pub semantic: SemanticStatus,
    pub loaded_at: DateTime<Utc>,
    pub age_secs: u64,
    pub fresh: bool,
}

impl BankSummary {
    pub fn from_bank(bank: &Bank) -> Self {
        Self {
            generation: bank.generation(),
            entries: bank.len(),
            skipped_rows: bank.skipped_rows(),
            fingerprint: format!("{:016x}", bank.fingerprint()),
            semantic: bank.semantic().clone(),
            loaded_at: bank.loaded_at(),
            age_secs: bank.age().as_secs(),
            fresh: bank.is_fresh(),
        }
    }
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub stages: Vec<StageKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<BankSummary>,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}

/// Ready once any bank generation has loaded, stale or not.
#[tracing::instrument(skip(state))]
pub async fn ready_handler<F, E>(State(state): State<HandlerState<F, E>>) -> Response
where
    F: EntryFetcher + 'static,
    E: Embedder + 'static,
{
    let bank = state.resolver.cache().current();
    let (status_code, status) = if bank.is_some() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "pending")
    };

    (
        status_code,
        Json(ReadyResponse {
            status,
            stages: state.resolver.stage_kinds(),
            bank: bank.as_deref().map(BankSummary::from_bank),
        }),
    )
        .into_response()
}
