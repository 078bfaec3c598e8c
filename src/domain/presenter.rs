//! Table presenter
//!
//! Pages a filtered view and performs single-row mutations. Each action is
//! one envelope round trip; the caller decides how to refresh afterwards.

use serde::Serialize;
use serde_json::{Map, Value};

use super::features::FeatureConfig;
use super::filters::paginate;
use super::records::{Record, RecordStatus};
use crate::api::{Paginated, PaginationParams};
use crate::error::ApiError;
use crate::services::upstream::{UpstreamClient, UpstreamError, UpstreamResponse};

/// What a successful row action changed, so cached views can follow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RowChange {
    Created,
    Edited { id: String },
    Deleted { id: String },
    StatusChanged { id: String, status: RecordStatus },
}

pub struct TablePresenter<'a> {
    feature: &'a FeatureConfig,
    client: &'a UpstreamClient,
}

impl<'a> TablePresenter<'a> {
    pub fn new(feature: &'a FeatureConfig, client: &'a UpstreamClient) -> Self {
        Self { feature, client }
    }

    /// One page of `rows` (1-indexed `params`, as the dashboard sends them).
    pub fn page(rows: &[Record], params: &PaginationParams) -> Paginated<Record> {
        let page = paginate(
            rows,
            (params.page() - 1) as usize,
            params.per_page() as usize,
        );
        Paginated::new(page.to_vec(), params, rows.len() as u64)
    }

    fn ensure_mutable(&self) -> Result<(), ApiError> {
        if self.feature.mutable {
            Ok(())
        } else {
            Err(ApiError::BadRequest(format!(
                "{} is read-only",
                self.feature.title
            )))
        }
    }

    async fn submit(
        &self,
        path: &str,
        body: Value,
        accepted: &[u16],
        request_id: Option<&str>,
    ) -> Result<UpstreamResponse, ApiError> {
        let response = self.client.post_envelope(path, &body, request_id).await?;
        if accepted.contains(&response.status) {
            Ok(response)
        } else {
            Err(ApiError::Upstream(UpstreamError::Rejected {
                status: response.status,
                message: response
                    .message
                    .unwrap_or_else(|| format!("Request failed with status {}", response.status)),
            }))
        }
    }

    pub async fn create(
        &self,
        body: Value,
        request_id: Option<&str>,
    ) -> Result<RowChange, ApiError> {
        self.ensure_mutable()?;
        let body = require_object(body)?;
        self.submit(&self.feature.routes.create, Value::Object(body), &[200, 201], request_id)
            .await?;

        tracing::info!(feature = %self.feature.kind, "Row created");
        Ok(RowChange::Created)
    }

    pub async fn edit(
        &self,
        id: &str,
        changes: Value,
        request_id: Option<&str>,
    ) -> Result<RowChange, ApiError> {
        self.ensure_mutable()?;
        let mut body = require_object(changes)?;
        body.insert("id".into(), id_value(id));
        self.submit(&self.feature.routes.update, Value::Object(body), &[200], request_id)
            .await?;

        tracing::info!(feature = %self.feature.kind, id = id, "Row edited");
        Ok(RowChange::Edited { id: id.to_string() })
    }

    pub async fn delete(&self, id: &str, request_id: Option<&str>) -> Result<RowChange, ApiError> {
        self.ensure_mutable()?;
        let mut body = Map::new();
        body.insert("id".into(), id_value(id));
        self.submit(&self.feature.routes.delete, Value::Object(body), &[200], request_id)
            .await?;

        tracing::info!(feature = %self.feature.kind, id = id, "Row deleted");
        Ok(RowChange::Deleted { id: id.to_string() })
    }

    pub async fn set_status(
        &self,
        id: &str,
        status: RecordStatus,
        request_id: Option<&str>,
    ) -> Result<RowChange, ApiError> {
        self.ensure_mutable()?;
        if self.feature.filter.status_field.is_none() {
            return Err(ApiError::BadRequest(format!(
                "{} rows have no status",
                self.feature.title
            )));
        }

        let mut body = Map::new();
        body.insert("id".into(), id_value(id));
        body.insert("status".into(), Value::from(status.code()));
        self.submit(&self.feature.routes.status, Value::Object(body), &[200], request_id)
            .await?;

        tracing::info!(feature = %self.feature.kind, id = id, status = %status, "Row status changed");
        Ok(RowChange::StatusChanged {
            id: id.to_string(),
            status,
        })
    }
}

fn require_object(value: Value) -> Result<Map<String, Value>, ApiError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::BadRequest("Request body must be a JSON object".to_string())),
    }
}

/// Numeric ids go upstream as numbers. Anything that would not print back
/// identically (`007`, `+7`) stays a string.
fn id_value(id: &str) -> Value {
    match id.parse::<i64>() {
        Ok(n) if n.to_string() == id => Value::from(n),
        _ => Value::String(id.to_string()),
    }
}
