//! Report container
//!
//! Owns one feature's fetched dataset and filter state. `shown` is always
//! recomputed from `all_data`; only [`ReportContainer::fetch`] talks to the
//! upstream.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use super::features::{FeatureConfig, ListMethod};
use super::filters::{apply_filters, FilterOverrides, Filters};
use super::records::{field_decimal, record_status, Record, RecordStatus};
use crate::services::upstream::{UpstreamClient, UpstreamError};

/// Stats cards shown above a report table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportSummary {
    pub total: usize,
    pub shown: usize,
    pub active: usize,
    pub inactive: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_total: Option<Decimal>,
}

#[derive(Debug)]
pub struct ReportContainer<'a> {
    feature: &'a FeatureConfig,
    all_data: Vec<Record>,
    shown: Vec<Record>,
    filters: Filters,
    report: Option<Value>,
    loading: bool,
    error: Option<String>,
}

impl<'a> ReportContainer<'a> {
    pub fn new(feature: &'a FeatureConfig, today: NaiveDate) -> Self {
        Self {
            feature,
            all_data: Vec::new(),
            shown: Vec::new(),
            filters: Filters::defaults(today),
            report: None,
            loading: false,
            error: None,
        }
    }

    pub fn feature(&self) -> &FeatureConfig {
        self.feature
    }

    pub fn all_data(&self) -> &[Record] {
        &self.all_data
    }

    pub fn shown(&self) -> &[Record] {
        &self.shown
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn report(&self) -> Option<&Value> {
        self.report.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Plaintext body sent (encrypted) with the list request.
    pub fn fetch_request(&self) -> Value {
        let mut body = Map::new();
        if self.feature.range_bounded {
            if let Some(from) = self.filters.from_date {
                body.insert("from_date".into(), Value::String(from.to_string()));
            }
            if let Some(to) = self.filters.to_date {
                body.insert("to_date".into(), Value::String(to.to_string()));
            }
            for (name, value) in &self.filters.facets {
                if let Some(field) = self.feature.filter.facet_field(name) {
                    body.insert(field.into(), Value::String(value.clone()));
                }
            }
        }
        Value::Object(body)
    }

    /// Fetch the dataset and reapply the current filters.
    ///
    /// On any failure the dataset is cleared and `error` holds the message
    /// the dashboard shows.
    pub async fn fetch(
        &mut self,
        client: &UpstreamClient,
        request_id: Option<&str>,
    ) -> Result<(), UpstreamError> {
        self.loading = true;
        self.error = None;

        let feature = self.feature;
        let routes = &feature.routes;
        let result = match routes.list_method {
            ListMethod::Post => {
                client
                    .post_envelope(&routes.list, &self.fetch_request(), request_id)
                    .await
            }
            ListMethod::Get => client.get_envelope(&routes.list, request_id).await,
        }
        .and_then(|response| response.into_result());

        self.loading = false;

        match result {
            Ok(response) => {
                tracing::debug!(
                    feature = %self.feature.kind,
                    status = response.status,
                    "Report fetched"
                );
                self.load(extract_rows(response.data), response.report);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(feature = %self.feature.kind, error = %e, "Report fetch failed");
                self.error = Some(e.user_message());
                self.all_data.clear();
                self.shown.clear();
                self.report = None;
                Err(e)
            }
        }
    }

    /// Replace the dataset without fetching (e.g. from a snapshot).
    pub fn load(&mut self, rows: Vec<Record>, report: Option<Value>) {
        self.all_data = rows;
        self.report = report;
        self.refresh_shown();
    }

    pub fn apply_filters(&mut self, overrides: FilterOverrides) {
        self.filters = self.filters.merged(overrides);
        self.refresh_shown();
    }

    pub fn reset_filters(&mut self, today: NaiveDate) {
        self.filters = Filters::defaults(today);
        self.refresh_shown();
    }

    fn refresh_shown(&mut self) {
        self.shown = apply_filters(&self.feature.filter, &self.all_data, &self.filters);
    }

    pub fn summary(&self) -> ReportSummary {
        let count = |status: RecordStatus| match self.feature.filter.status_field {
            Some(field) => self
                .shown
                .iter()
                .filter(|r| record_status(r, field) == Some(status))
                .count(),
            None => 0,
        };

        let amount_total = self.feature.amount_field.map(|field| {
            self.shown
                .iter()
                .filter_map(|r| field_decimal(r, field))
                .sum::<Decimal>()
        });

        ReportSummary {
            total: self.all_data.len(),
            shown: self.shown.len(),
            active: count(RecordStatus::Active),
            inactive: count(RecordStatus::Inactive),
            amount_total,
        }
    }
}

/// Pull the row array out of a decoded `data` payload.
pub fn extract_rows(data: Value) -> Vec<Record> {
    match data {
        Value::Array(rows) => rows,
        Value::Object(mut obj) => ["rows", "list", "data"]
            .iter()
            .find_map(|key| match obj.remove(*key) {
                Some(Value::Array(rows)) => Some(rows),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::{FeatureKind, FeatureRegistry};
    use crate::domain::filters::StatusFilter;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    fn crm_rows() -> Vec<Record> {
        vec![
            json!({"id": 1, "crm_name": "foo leads", "status": 1, "created_on": "2024-03-02"}),
            json!({"id": 2, "crm_name": "bar", "status": 2, "created_on": "2024-03-03"}),
            json!({"id": 3, "crm_name": "baz", "status": 0, "created_on": "2024-03-04"}),
        ]
    }

    #[test]
    fn selecting_active_shows_only_active_rows() {
        let registry = FeatureRegistry::builtin();
        let mut container = ReportContainer::new(registry.get(FeatureKind::CrmLinks), today());
        container.load(crm_rows(), None);
        assert_eq!(container.shown().len(), 3);

        container.apply_filters(FilterOverrides {
            status: Some(StatusFilter::Active),
            ..Default::default()
        });
        assert_eq!(container.shown().len(), 1);
        assert_eq!(container.shown()[0]["id"], 1);
        assert_eq!(container.all_data().len(), 3);
    }

    #[test]
    fn search_match_wins_regardless_of_status_choice() {
        let registry = FeatureRegistry::builtin();
        let mut container = ReportContainer::new(registry.get(FeatureKind::CrmLinks), today());
        container.load(crm_rows(), None);
        container.apply_filters(FilterOverrides {
            search: Some("foo".into()),
            ..Default::default()
        });
        assert_eq!(container.shown().len(), 1);
        assert_eq!(container.shown()[0]["crm_name"], "foo leads");
    }

    #[test]
    fn reset_restores_defaults() {
        let registry = FeatureRegistry::builtin();
        let mut container = ReportContainer::new(registry.get(FeatureKind::CrmLinks), today());
        container.load(crm_rows(), None);
        container.apply_filters(FilterOverrides {
            search: Some("nothing matches".into()),
            from_date: Some(None),
            ..Default::default()
        });
        assert!(container.shown().is_empty());

        container.reset_filters(today());
        assert_eq!(container.filters(), &Filters::defaults(today()));
        assert_eq!(container.shown().len(), 3);
    }

    #[test]
    fn summary_counts_statuses_and_sums_amounts() {
        let registry = FeatureRegistry::builtin();
        let mut container = ReportContainer::new(registry.get(FeatureKind::PrimeUsers), today());
        container.load(
            vec![
                json!({"id": 1, "status": 1, "amount": "99.50", "created_on": "2024-03-10"}),
                json!({"id": 2, "status": 2, "amount": 100, "created_on": "2024-03-11"}),
                json!({"id": 3, "status": 1, "amount": 5, "created_on": "2024-02-01"}),
            ],
            Some(json!({"total_users": 3})),
        );
        let summary = container.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.shown, 2);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.inactive, 1);
        assert_eq!(summary.amount_total, Some(Decimal::new(19950, 2)));
        assert_eq!(container.report(), Some(&json!({"total_users": 3})));
    }

    #[test]
    fn fetch_request_only_carries_window_for_range_bounded_features() {
        let registry = FeatureRegistry::builtin();
        let income = ReportContainer::new(registry.get(FeatureKind::Income), today());
        assert_eq!(
            income.fetch_request(),
            json!({"from_date": "2024-03-01", "to_date": "2024-03-20"})
        );

        let banners = ReportContainer::new(registry.get(FeatureKind::Banners), today());
        assert_eq!(banners.fetch_request(), json!({}));
    }

    #[test]
    fn extract_rows_unwraps_known_shapes() {
        assert_eq!(extract_rows(json!([{"id": 1}])).len(), 1);
        assert_eq!(extract_rows(json!({"rows": [{"id": 1}, {"id": 2}]})).len(), 2);
        assert_eq!(extract_rows(json!({"list": [{"id": 1}]})).len(), 1);
        assert!(extract_rows(json!({"count": 4})).is_empty());
        assert!(extract_rows(json!("text")).is_empty());
    }
}
