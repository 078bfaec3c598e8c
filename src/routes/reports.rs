//! Report routes
//!
//! One generic handler serves every dashboard page: fetch (or reuse a
//! snapshot), filter, summarize, page.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::api::{Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::domain::records::{parse_day, Record};
use crate::domain::{
    FeatureConfig, FilterOverrides, Filters, ReportContainer, ReportSummary, StatusFilter,
    TablePresenter,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestIdExt;

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    #[serde(flatten)]
    pub page: Paginated<Record>,
    pub summary: ReportSummary,
    pub filters: Filters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Value>,
}

/// Parsed report query string. Keys naming one of the feature's facets
/// become facet filters; other unknown keys are ignored.
#[derive(Debug, Default)]
pub struct ReportQuery {
    pub overrides: FilterOverrides,
    pub pagination: PaginationParams,
    pub refresh: bool,
    pub reset: bool,
}

impl ReportQuery {
    pub fn parse(feature: &FeatureConfig, raw: HashMap<String, String>) -> ApiResult<Self> {
        let mut query = ReportQuery::default();
        let mut facets = BTreeMap::new();

        for (key, value) in raw {
            match key.as_str() {
                "search" => query.overrides.search = Some(value),
                "status" => {
                    let status = StatusFilter::parse(&value).ok_or_else(|| {
                        ApiError::BadRequest(format!("Unknown status filter '{}'", value))
                    })?;
                    query.overrides.status = Some(status);
                }
                "from_date" => query.overrides.from_date = Some(parse_bound(&key, &value)?),
                "to_date" => query.overrides.to_date = Some(parse_bound(&key, &value)?),
                "page" => query.pagination.page = Some(parse_number(&key, &value)?),
                "per_page" => query.pagination.per_page = Some(parse_number(&key, &value)?),
                "refresh" => query.refresh = parse_flag(&value),
                "reset" => query.reset = parse_flag(&value),
                name if feature.filter.facet_field(name).is_some() => {
                    facets.insert(name.to_string(), value);
                }
                _ => {
                    tracing::debug!(feature = %feature.kind, key = %key, "Ignoring unknown report parameter");
                }
            }
        }

        query.overrides.facets = facets;
        Ok(query)
    }
}

fn parse_bound(key: &str, value: &str) -> ApiResult<Option<NaiveDate>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_day(value)
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {} '{}'", key, value)))
}

fn parse_number(key: &str, value: &str) -> ApiResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {} '{}'", key, value)))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

pub(crate) fn lookup_feature<'a>(state: &'a AppState, slug: &str) -> ApiResult<&'a FeatureConfig> {
    state
        .features
        .by_slug(slug)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown feature '{}'", slug)))
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

async fn build_report(
    state: &AppState,
    feature: &FeatureConfig,
    query: ReportQuery,
    request_id: Option<&str>,
) -> ApiResult<ReportResponse> {
    let mut container = ReportContainer::new(feature, today());
    if query.reset {
        container.reset_filters(today());
    } else {
        container.apply_filters(query.overrides);
    }

    let request = container.fetch_request();
    let snapshot = if query.refresh {
        None
    } else {
        state.reports.get(feature.kind, &request)
    };

    match snapshot {
        Some(snapshot) => container.load(snapshot.rows, snapshot.report),
        None => {
            container.fetch(&state.upstream, request_id).await?;
            state.reports.put(
                feature.kind,
                &request,
                container.all_data().to_vec(),
                container.report().cloned(),
            );
        }
    }

    Ok(ReportResponse {
        page: TablePresenter::page(container.shown(), &query.pagination),
        summary: container.summary(),
        filters: container.filters().clone(),
        report: container.report().cloned(),
    })
}

/// GET /admin/:feature/report
pub async fn get_report(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Query(raw): Query<HashMap<String, String>>,
) -> ApiResult<Json<ReportResponse>> {
    let feature = lookup_feature(&state, &slug)?;
    let query = ReportQuery::parse(feature, raw)?;

    tracing::debug!(admin_id = %admin.admin_id, feature = %feature.kind, "Report requested");

    let response = build_report(&state, feature, query, headers.request_id()).await?;
    Ok(Json(response))
}

/// POST /admin/:feature/refresh
pub async fn refresh_report(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Query(raw): Query<HashMap<String, String>>,
) -> ApiResult<Json<ReportResponse>> {
    let feature = lookup_feature(&state, &slug)?;
    let mut query = ReportQuery::parse(feature, raw)?;
    query.refresh = true;

    state.reports.invalidate(feature.kind);
    tracing::info!(admin_id = %admin.admin_id, feature = %feature.kind, "Report refresh");

    let response = build_report(&state, feature, query, headers.request_id()).await?;
    Ok(Json(response))
}
