//! Filterable dataset
//!
//! Pure, feature-parametrized filtering and paging over fetched records.
//! Nothing in this module performs I/O.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::records::{field_date, field_i64, field_text, Record, RecordStatus};

/// Which record fields a feature filters on.
#[derive(Debug, Clone, Serialize)]
pub struct FilterSpec {
    pub search_fields: &'static [&'static str],
    pub status_field: Option<&'static str>,
    pub date_field: Option<&'static str>,
    /// `(query name, record field)`
    pub facets: &'static [(&'static str, &'static str)],
}

impl FilterSpec {
    pub fn new(
        search_fields: &'static [&'static str],
        date_field: Option<&'static str>,
        facets: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            search_fields,
            status_field: Some("status"),
            date_field,
            facets,
        }
    }

    pub fn without_status(mut self) -> Self {
        self.status_field = None;
        self
    }

    pub fn facet_field(&self, name: &str) -> Option<&'static str> {
        self.facets
            .iter()
            .find(|(facet, _)| *facet == name)
            .map(|(_, field)| *field)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Some(Self::All),
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    fn code(self) -> Option<i64> {
        match self {
            Self::All => None,
            Self::Active => Some(RecordStatus::Active.code()),
            Self::Inactive => Some(RecordStatus::Inactive.code()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Filters {
    pub search: String,
    pub status: StatusFilter,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub facets: BTreeMap<String, String>,
}

impl Filters {
    /// Current month start through `today`, nothing else narrowed.
    pub fn defaults(today: NaiveDate) -> Self {
        Self {
            from_date: today.with_day(1),
            to_date: Some(today),
            ..Default::default()
        }
    }

    pub fn merged(&self, overrides: FilterOverrides) -> Self {
        let mut next = self.clone();
        if let Some(search) = overrides.search {
            next.search = search;
        }
        if let Some(status) = overrides.status {
            next.status = status;
        }
        if let Some(from) = overrides.from_date {
            next.from_date = from;
        }
        if let Some(to) = overrides.to_date {
            next.to_date = to;
        }
        for (name, value) in overrides.facets {
            if value.trim().is_empty() {
                next.facets.remove(&name);
            } else {
                next.facets.insert(name, value);
            }
        }
        next
    }
}

/// Partial filter update. `Some(None)` on a date clears that bound.
#[derive(Debug, Clone, Default)]
pub struct FilterOverrides {
    pub search: Option<String>,
    pub status: Option<StatusFilter>,
    pub from_date: Option<Option<NaiveDate>>,
    pub to_date: Option<Option<NaiveDate>>,
    pub facets: BTreeMap<String, String>,
}

/// Filter `data` for display. Order is preserved and `data` is untouched.
pub fn apply_filters(spec: &FilterSpec, data: &[Record], filters: &Filters) -> Vec<Record> {
    let predicate = Predicate::build(spec, filters);
    data.iter().filter(|r| predicate.matches(r)).cloned().collect()
}

/// Compiled form of [`Filters`] for one pass over a dataset.
struct Predicate<'a> {
    spec: &'a FilterSpec,
    needle: Option<String>,
    status_code: Option<i64>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    facets: Vec<(&'static str, String)>,
}

impl<'a> Predicate<'a> {
    fn build(spec: &'a FilterSpec, filters: &Filters) -> Self {
        let needle = Some(filters.search.trim().to_lowercase()).filter(|s| !s.is_empty());
        let facets = filters
            .facets
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .filter_map(|(name, value)| {
                spec.facet_field(name)
                    .map(|field| (field, value.trim().to_lowercase()))
            })
            .collect();

        Self {
            spec,
            needle,
            status_code: spec.status_field.and(filters.status.code()),
            from: spec.date_field.and(filters.from_date),
            to: spec.date_field.and(filters.to_date),
            facets,
        }
    }

    fn matches(&self, record: &Record) -> bool {
        self.matches_search(record)
            && self.matches_status(record)
            && self.matches_dates(record)
            && self.matches_facets(record)
    }

    fn matches_search(&self, record: &Record) -> bool {
        let Some(needle) = &self.needle else {
            return true;
        };
        self.spec.search_fields.iter().any(|field| {
            field_text(record, field)
                .map(|text| text.to_lowercase().contains(needle.as_str()))
                .unwrap_or(false)
        })
    }

    fn matches_status(&self, record: &Record) -> bool {
        match (self.status_code, self.spec.status_field) {
            (Some(code), Some(field)) => field_i64(record, field) == Some(code),
            _ => true,
        }
    }

    fn matches_dates(&self, record: &Record) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(day) = self.spec.date_field.and_then(|f| field_date(record, f)) else {
            return false;
        };
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }

    fn matches_facets(&self, record: &Record) -> bool {
        self.facets.iter().all(|(field, expected)| {
            field_text(record, field)
                .map(|text| text.trim().to_lowercase() == *expected)
                .unwrap_or(false)
        })
    }
}

/// Zero-based page slice. Past the last page, or with `per_page == 0`, the
/// slice is empty.
pub fn paginate<T>(rows: &[T], page: usize, per_page: usize) -> &[T] {
    let start = page.saturating_mul(per_page).min(rows.len());
    let end = start.saturating_add(per_page).min(rows.len());
    &rows[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CRM: &[&str] = &["crm_name", "link"];

    fn spec() -> FilterSpec {
        FilterSpec::new(CRM, Some("created_on"), &[("app", "app_id")])
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dataset() -> Vec<Record> {
        vec![
            json!({"id": 1, "crm_name": "Foo Funnel", "link": "https://a", "status": 1, "app_id": 3, "created_on": "2024-03-01"}),
            json!({"id": 2, "crm_name": "Bar", "link": "https://b", "status": 2, "app_id": 4, "created_on": "2024-03-15 10:00:00"}),
            json!({"id": 3, "crm_name": "Baz", "link": "https://c", "status": 0, "app_id": 3, "created_on": "2024-03-31T23:59:59Z"}),
        ]
    }

    fn ids(rows: &[Record]) -> Vec<i64> {
        rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    fn unbounded() -> Filters {
        Filters::default()
    }

    #[test]
    fn active_status_keeps_only_code_one() {
        let filters = Filters {
            status: StatusFilter::Active,
            ..unbounded()
        };
        assert_eq!(ids(&apply_filters(&spec(), &dataset(), &filters)), vec![1]);
    }

    #[test]
    fn status_filter_is_idempotent() {
        let filters = Filters {
            status: StatusFilter::Inactive,
            ..unbounded()
        };
        let once = apply_filters(&spec(), &dataset(), &filters);
        let twice = apply_filters(&spec(), &once, &filters);
        assert_eq!(once, twice);
        assert_eq!(ids(&once), vec![2]);
    }

    #[test]
    fn search_is_case_insensitive_and_field_scoped() {
        let filters = Filters {
            search: "  fOO ".to_string(),
            ..unbounded()
        };
        let shown = apply_filters(&spec(), &dataset(), &filters);
        assert_eq!(ids(&shown), vec![1]);

        // status does not appear in search fields
        let filters = Filters {
            search: "1".to_string(),
            ..unbounded()
        };
        assert!(apply_filters(&spec(), &dataset(), &filters).is_empty());
    }

    #[test]
    fn search_result_ignores_status_when_status_is_all() {
        for status in [StatusFilter::All, StatusFilter::Active] {
            let filters = Filters {
                search: "foo".to_string(),
                status,
                ..unbounded()
            };
            assert_eq!(ids(&apply_filters(&spec(), &dataset(), &filters)), vec![1]);
        }
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let filters = Filters {
            from_date: Some(day(2024, 3, 1)),
            to_date: Some(day(2024, 3, 31)),
            ..unbounded()
        };
        assert_eq!(ids(&apply_filters(&spec(), &dataset(), &filters)), vec![1, 2, 3]);

        let filters = Filters {
            from_date: Some(day(2024, 3, 15)),
            to_date: Some(day(2024, 3, 15)),
            ..unbounded()
        };
        assert_eq!(ids(&apply_filters(&spec(), &dataset(), &filters)), vec![2]);
    }

    #[test]
    fn undated_records_fall_outside_any_window() {
        let data = vec![json!({"id": 9, "crm_name": "No date", "status": 1})];
        let filters = Filters::defaults(day(2024, 3, 20));
        assert!(apply_filters(&spec(), &data, &filters).is_empty());
        assert_eq!(apply_filters(&spec(), &data, &unbounded()).len(), 1);
    }

    #[test]
    fn defaults_cover_month_to_date() {
        let filters = Filters::defaults(day(2024, 3, 20));
        assert_eq!(filters.from_date, Some(day(2024, 3, 1)));
        assert_eq!(filters.to_date, Some(day(2024, 3, 20)));
        assert_eq!(filters.status, StatusFilter::All);
        assert!(filters.search.is_empty());
        // only the window narrows
        assert_eq!(ids(&apply_filters(&spec(), &dataset(), &filters)), vec![1, 2]);
    }

    #[test]
    fn features_without_date_or_status_ignore_those_filters() {
        let undated = FilterSpec::new(CRM, None, &[]).without_status();
        let filters = Filters {
            status: StatusFilter::Active,
            ..Filters::defaults(day(2020, 1, 5))
        };
        assert_eq!(apply_filters(&undated, &dataset(), &filters).len(), 3);
    }

    #[test]
    fn facets_match_declared_fields_only() {
        let mut filters = unbounded();
        filters.facets.insert("app".to_string(), "3".to_string());
        assert_eq!(ids(&apply_filters(&spec(), &dataset(), &filters)), vec![1, 3]);

        let mut filters = unbounded();
        filters.facets.insert("plan".to_string(), "gold".to_string());
        assert_eq!(apply_filters(&spec(), &dataset(), &filters).len(), 3);
    }

    #[test]
    fn merge_overrides_and_clears() {
        let base = Filters::defaults(day(2024, 3, 20));
        let mut facets = BTreeMap::new();
        facets.insert("app".to_string(), "3".to_string());
        let next = base.merged(FilterOverrides {
            search: Some("bar".into()),
            from_date: Some(None),
            facets,
            ..Default::default()
        });
        assert_eq!(next.search, "bar");
        assert_eq!(next.from_date, None);
        assert_eq!(next.to_date, base.to_date);
        assert_eq!(next.facets.get("app").map(String::as_str), Some("3"));

        let cleared = next.merged(FilterOverrides {
            facets: BTreeMap::from([("app".to_string(), String::new())]),
            ..Default::default()
        });
        assert!(cleared.facets.is_empty());
    }

    #[test]
    fn filtering_never_mutates_input() {
        let data = dataset();
        let before = data.clone();
        let _ = apply_filters(&spec(), &data, &Filters::defaults(day(2024, 3, 2)));
        assert_eq!(data, before);
    }

    #[test]
    fn paginate_is_total() {
        let rows: Vec<u32> = (0..23).collect();
        assert_eq!(paginate(&rows, 0, 10), &rows[0..10]);
        assert_eq!(paginate(&rows, 2, 10), &rows[20..23]);
        assert!(paginate(&rows, 3, 10).is_empty());
        assert!(paginate(&rows, usize::MAX, 10).is_empty());
        assert!(paginate(&rows, 0, 0).is_empty());
        assert!(paginate::<u32>(&[], 0, 10).is_empty());
    }
}
