use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::bank::EntryFetcher;
use crate::embedding::Embedder;
use crate::gateway::BankSummary;
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::pipeline::{ANSWER_SOURCE_HEADER, ResolutionResult};

/// Query text under any of the accepted names; the first non-blank one wins.
#[derive(Debug, Default, Deserialize)]
pub struct AskParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
}

impl AskParams {
    pub fn into_text(self) -> Result<String, GatewayError> {
        [self.q, self.query, self.question]
            .into_iter()
            .flatten()
            .find(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::InvalidRequest("missing 'q', 'query' or 'question'".to_string())
            })
    }
}

pub fn make_response(result: ResolutionResult) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        ANSWER_SOURCE_HEADER,
        HeaderValue::from_static(result.source.as_str()),
    );
    (StatusCode::OK, headers, Json(result)).into_response()
}

async fn answer<F, E>(state: &HandlerState<F, E>, text: &str) -> Result<Response, GatewayError>
where
    F: EntryFetcher + 'static,
    E: Embedder + 'static,
{
    let result = state.resolver.resolve(text).await?;
    debug!(source = %result.source, "Answered");
    Ok(make_response(result))
}

#[instrument(skip(state, params))]
pub async fn ask_get_handler<F, E>(
    State(state): State<HandlerState<F, E>>,
    Query(params): Query<AskParams>,
) -> Result<Response, GatewayError>
where
    F: EntryFetcher + 'static,
    E: Embedder + 'static,
{
    let text = params.into_text()?;
    answer(&state, &text).await
}

#[instrument(skip(state, payload))]
pub async fn ask_post_handler<F, E>(
    State(state): State<HandlerState<F, E>>,
    payload: Result<Json<AskParams>, JsonRejection>,
) -> Result<Response, GatewayError>
where
    F: EntryFetcher + 'static,
    E: Embedder + 'static,
{
    let Json(params) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let text = params.into_text()?;
    answer(&state, &text).await
}

/// Drops the current generation and reloads it now.
#[instrument(skip(state))]
pub async fn refresh_handler<F, E>(
    State(state): State<HandlerState<F, E>>,
) -> Result<Response, GatewayError>
where
    F: EntryFetcher + 'static,
    E: Embedder + 'static,
{
    let cache = state.resolver.cache();
    cache.invalidate();
    let bank = cache.refresh().await.map_err(|e| {
        warn!(error = %e, "Manual refresh failed");
        GatewayError::Upstream(e.to_string())
    })?;

    Ok((StatusCode::OK, Json(BankSummary::from_bank(&bank))).into_response())
}
