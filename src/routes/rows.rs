//! Row action routes (create / edit / delete / status)

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::reports::lookup_feature;
use crate::api::Created;
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::domain::{FeatureConfig, RecordStatus, RowChange, TablePresenter};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestIdExt;

#[derive(Debug, Serialize)]
pub struct RowActionResponse {
    pub message: String,
    pub change: RowChange,
}

/// Body of a status request. With neither field set, the row's last-known
/// status is toggled.
#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    /// Explicit target status (`active`, `inactive`, `deleted`)
    #[serde(default)]
    pub status: Option<String>,
    /// Status the dashboard currently shows, to toggle from
    #[serde(default)]
    pub current: Option<String>,
}

fn finish(state: &AppState, feature: &FeatureConfig, change: RowChange, message: &str) -> RowActionResponse {
    state
        .reports
        .apply_change(feature.kind, feature.filter.status_field, &change);
    RowActionResponse {
        message: message.to_string(),
        change,
    }
}

/// POST /admin/:feature/rows
pub async fn create_row(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult<Created<RowActionResponse>> {
    let feature = lookup_feature(&state, &slug)?;
    tracing::info!(admin_id = %admin.admin_id, feature = %feature.kind, "Creating row");

    let change = TablePresenter::new(feature, &state.upstream)
        .create(body, headers.request_id())
        .await?;
    Ok(Created(finish(&state, feature, change, "Created")))
}

/// PUT /admin/:feature/rows/:id
pub async fn edit_row(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(changes): Json<Value>,
) -> ApiResult<Json<RowActionResponse>> {
    let feature = lookup_feature(&state, &slug)?;
    tracing::info!(admin_id = %admin.admin_id, feature = %feature.kind, id = %id, "Editing row");

    let change = TablePresenter::new(feature, &state.upstream)
        .edit(&id, changes, headers.request_id())
        .await?;
    Ok(Json(finish(&state, feature, change, "Updated")))
}

/// DELETE /admin/:feature/rows/:id
pub async fn delete_row(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<RowActionResponse>> {
    let feature = lookup_feature(&state, &slug)?;
    tracing::info!(admin_id = %admin.admin_id, feature = %feature.kind, id = %id, "Deleting row");

    let change = TablePresenter::new(feature, &state.upstream)
        .delete(&id, headers.request_id())
        .await?;
    Ok(Json(finish(&state, feature, change, "Deleted")))
}

/// POST /admin/:feature/rows/:id/status
pub async fn set_row_status(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Option<Json<StatusRequest>>,
) -> ApiResult<Json<RowActionResponse>> {
    let feature = lookup_feature(&state, &slug)?;
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let target = resolve_target(&state, feature, &id, request)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        feature = %feature.kind,
        id = %id,
        status = %target,
        "Changing row status"
    );

    let change = TablePresenter::new(feature, &state.upstream)
        .set_status(&id, target, headers.request_id())
        .await?;
    Ok(Json(finish(&state, feature, change, "Status updated")))
}

fn resolve_target(
    state: &AppState,
    feature: &FeatureConfig,
    id: &str,
    request: StatusRequest,
) -> ApiResult<RecordStatus> {
    let parse = |raw: &str| {
        RecordStatus::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown status '{}'", raw)))
    };

    if let Some(status) = request.status {
        return parse(&status);
    }
    if let Some(current) = request.current {
        return Ok(parse(&current)?.toggled());
    }

    feature
        .filter
        .status_field
        .and_then(|field| state.reports.find_status(feature.kind, field, id))
        .map(RecordStatus::toggled)
        .ok_or_else(|| {
            ApiError::BadRequest("Current status unknown; send 'status' or 'current'".to_string())
        })
}
