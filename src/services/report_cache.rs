//! In-memory snapshots of fetched report datasets.
//!
//! Lets the dashboard page and refilter a dataset without refetching it.
//! Keyed by feature and the plaintext fetch request, so a different date
//! window is a different snapshot.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::features::FeatureKind;
use crate::domain::presenter::RowChange;
use crate::domain::records::{record_id, record_status, Record, RecordStatus};

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub rows: Vec<Record>,
    pub report: Option<Value>,
    fetched_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    feature: FeatureKind,
    request: String,
}

#[derive(Clone)]
pub struct ReportCache {
    inner: Arc<RwLock<HashMap<CacheKey, Snapshot>>>,
    ttl: Duration,
}

impl ReportCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    fn key(feature: FeatureKind, request: &Value) -> CacheKey {
        CacheKey {
            feature,
            request: request.to_string(),
        }
    }

    pub fn get(&self, feature: FeatureKind, request: &Value) -> Option<Snapshot> {
        let inner = self.inner.read();
        let snapshot = inner.get(&Self::key(feature, request))?;
        if snapshot.fetched_at.elapsed() < self.ttl {
            tracing::debug!(feature = %feature, "Report snapshot hit");
            Some(snapshot.clone())
        } else {
            None
        }
    }

    pub fn put(&self, feature: FeatureKind, request: &Value, rows: Vec<Record>, report: Option<Value>) {
        let mut inner = self.inner.write();
        inner.retain(|_, s| s.fetched_at.elapsed() < self.ttl);
        inner.insert(
            Self::key(feature, request),
            Snapshot {
                rows,
                report,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Last-known status of a row in any live snapshot of the feature.
    pub fn find_status(&self, feature: FeatureKind, status_field: &str, id: &str) -> Option<RecordStatus> {
        let inner = self.inner.read();
        inner
            .iter()
            .filter(|(k, s)| k.feature == feature && s.fetched_at.elapsed() < self.ttl)
            .flat_map(|(_, s)| s.rows.iter())
            .find(|r| record_id(r).as_deref() == Some(id))
            .and_then(|r| record_status(r, status_field))
    }

    /// Drop every snapshot of a feature.
    pub fn invalidate(&self, feature: FeatureKind) {
        self.inner.write().retain(|k, _| k.feature != feature);
        tracing::debug!(feature = %feature, "Report snapshots invalidated");
    }

    /// Follow a successful row action in every snapshot of the feature.
    ///
    /// Deletes and status changes are patched in place; creates and edits
    /// invalidate so the next read refetches.
    pub fn apply_change(&self, feature: FeatureKind, status_field: Option<&str>, change: &RowChange) {
        match change {
            RowChange::Created | RowChange::Edited { .. } => self.invalidate(feature),
            RowChange::Deleted { id } => {
                let mut inner = self.inner.write();
                for (_, snapshot) in inner.iter_mut().filter(|(k, _)| k.feature == feature) {
                    snapshot
                        .rows
                        .retain(|r| record_id(r).as_deref() != Some(id.as_str()));
                }
            }
            RowChange::StatusChanged { id, status } => {
                let Some(field) = status_field else {
                    return self.invalidate(feature);
                };
                let mut inner = self.inner.write();
                for (_, snapshot) in inner.iter_mut().filter(|(k, _)| k.feature == feature) {
                    for row in snapshot
                        .rows
                        .iter_mut()
                        .filter(|r| record_id(r).as_deref() == Some(id.as_str()))
                    {
                        if let Value::Object(obj) = row {
                            obj.insert(field.to_string(), Value::from(status.code()));
                        }
                    }
                }
            }
        }
    }
}
