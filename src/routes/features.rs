use axum::extract::State;
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::domain::FeatureConfig;

/// GET /features
///
/// Feature descriptors the dashboard builds its pages from: searchable
/// fields, facets, whether rows can be edited.
pub async fn list_features(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> DataResponse<Vec<FeatureConfig>> {
    DataResponse::new(state.features.iter().cloned().collect())
}
