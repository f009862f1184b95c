//! Gated data-access routes.
//!
//! Every data store call goes through the coordinator's retry-wrapped invoker;
//! handlers never hold a client beyond one attempt.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::response::ApiError;
use crate::http::server::AppState;

const DEFAULT_TABLE_LIMIT: usize = 100;
const MAX_TABLE_LIMIT: usize = 1000;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tables", get(list_tables))
        .route("/tables/{table}/items/{id}", get(get_item))
        .route("/payments/config", get(payments_config))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

async fn list_tables(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let limit = match params.limit {
        Some(0) => return Err(ApiError::BadRequest("limit must be positive".into())),
        Some(n) => n.min(MAX_TABLE_LIMIT),
        None => DEFAULT_TABLE_LIMIT,
    };

    let coordinator = &state.services.coordinator;
    let tables = coordinator
        .run_with_retry(move |client| async move { client.list_tables(limit).await })
        .await
        .map_err(|e| ApiError::from_datastore(e, coordinator.retry_after()))?;

    Ok(Json(json!({ "tables": tables })))
}

async fn get_item(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let coordinator = &state.services.coordinator;
    let (table, id) = (table.as_str(), id.as_str());
    let item = coordinator
        .run_with_retry(move |client| async move { client.get_item(table, id).await })
        .await
        .map_err(|e| ApiError::from_datastore(e, coordinator.retry_after()))?;

    Ok(Json(json!({ "item": item })))
}

async fn payments_config(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let retry_after = state.services.coordinator.retry_after();
    let key = state
        .services
        .secrets
        .payment_publishable_key()
        .await
        .map_err(|e| ApiError::from_secret(e, retry_after))?;

    Ok(Json(json!({ "publishableKey": key })))
}
