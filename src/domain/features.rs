//! Dashboard feature registry
//!
//! Each dashboard page (CRM links, banners, income report, ...) is one
//! [`FeatureConfig`]: which upstream paths it talks to and how its records
//! are searched, filtered and summed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::filters::FilterSpec;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    CrmLinks,
    Banners,
    Courses,
    Feedback,
    Notifications,
    Income,
    Profit,
    Returns,
    PrimeUsers,
    Messages,
    Sites,
    Policies,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 12] = [
        Self::CrmLinks,
        Self::Banners,
        Self::Courses,
        Self::Feedback,
        Self::Notifications,
        Self::Income,
        Self::Profit,
        Self::Returns,
        Self::PrimeUsers,
        Self::Messages,
        Self::Sites,
        Self::Policies,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::CrmLinks => "crm_links",
            Self::Banners => "banners",
            Self::Courses => "courses",
            Self::Feedback => "feedback",
            Self::Notifications => "notifications",
            Self::Income => "income",
            Self::Profit => "profit",
            Self::Returns => "returns",
            Self::PrimeUsers => "prime_users",
            Self::Messages => "messages",
            Self::Sites => "sites",
            Self::Policies => "policies",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slug() == slug)
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListMethod {
    /// POST `{ data: <envelope> }` carrying the filter request
    Post,
    /// Plain GET, response still carries an encrypted `data` field
    Get,
}

/// Upstream paths for one feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureRoutes {
    pub list: String,
    pub list_method: ListMethod,
    pub create: String,
    pub update: String,
    pub delete: String,
    pub status: String,
}

impl FeatureRoutes {
    fn defaults(kind: FeatureKind) -> Self {
        let base = format!("/api/admin/{}", kind.slug());
        Self {
            list: format!("{}/list", base),
            list_method: ListMethod::Post,
            create: format!("{}/create", base),
            update: format!("{}/update", base),
            delete: format!("{}/delete", base),
            status: format!("{}/status", base),
        }
    }

    fn apply(&mut self, patch: RoutesPatch) {
        if let Some(v) = patch.list {
            self.list = v;
        }
        if let Some(v) = patch.list_method {
            self.list_method = v;
        }
        if let Some(v) = patch.create {
            self.create = v;
        }
        if let Some(v) = patch.update {
            self.update = v;
        }
        if let Some(v) = patch.delete {
            self.delete = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
    }
}

/// Partial route override as read from `UPSTREAM_ROUTES_FILE`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutesPatch {
    #[serde(default)]
    pub list: Option<String>,
    #[serde(default)]
    pub list_method: Option<ListMethod>,
    #[serde(default)]
    pub create: Option<String>,
    #[serde(default)]
    pub update: Option<String>,
    #[serde(default)]
    pub delete: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureConfig {
    pub kind: FeatureKind,
    pub title: &'static str,
    #[serde(skip)]
    pub routes: FeatureRoutes,
    #[serde(flatten)]
    pub filter: FilterSpec,
    /// Numeric field summed for stats cards
    pub amount_field: Option<&'static str>,
    /// Fetch request carries the date window
    pub range_bounded: bool,
    /// Row actions (create/edit/delete/status) are available
    pub mutable: bool,
}

impl FeatureConfig {
    pub fn builtin(kind: FeatureKind) -> Self {
        use FeatureKind::*;

        let (title, search, date, facets, amount, range_bounded, mutable): (
            &'static str,
            &'static [&'static str],
            Option<&'static str>,
            &'static [(&'static str, &'static str)],
            Option<&'static str>,
            bool,
            bool,
        ) = match kind {
            CrmLinks => (
                "CRM links",
                &["crm_name", "link", "app_name"],
                Some("created_on"),
                &[("app", "app_id")],
                None,
                false,
                true,
            ),
            Banners => (
                "Banners",
                &["title", "banner_type", "link"],
                Some("created_on"),
                &[("app", "app_id")],
                None,
                false,
                true,
            ),
            Courses => (
                "Course videos",
                &["title", "description", "category_name"],
                Some("created_on"),
                &[("category", "category_id")],
                None,
                false,
                true,
            ),
            Feedback => (
                "Feedback tickets",
                &["name", "email", "subject", "message"],
                Some("created_on"),
                &[],
                None,
                true,
                true,
            ),
            Notifications => (
                "Notifications",
                &["title", "message"],
                Some("created_on"),
                &[("app", "app_id")],
                None,
                true,
                true,
            ),
            Income => (
                "Income report",
                &["name", "email", "mobile", "transaction_id"],
                Some("created_on"),
                &[("type", "income_type")],
                Some("amount"),
                true,
                false,
            ),
            Profit => (
                "Profit report",
                &["name", "email", "mobile"],
                Some("created_on"),
                &[],
                Some("profit"),
                true,
                false,
            ),
            Returns => (
                "Return report",
                &["name", "email", "mobile"],
                Some("created_on"),
                &[("multiplier", "multiplier")],
                Some("amount"),
                true,
                false,
            ),
            PrimeUsers => (
                "Prime users",
                &["name", "email", "mobile", "plan_name"],
                Some("created_on"),
                &[("plan", "plan_name")],
                Some("amount"),
                true,
                true,
            ),
            Messages => (
                "Message templates",
                &["title", "message", "template_type"],
                None,
                &[],
                None,
                false,
                true,
            ),
            Sites => (
                "Sites",
                &["site_name", "url"],
                None,
                &[("app", "app_id")],
                None,
                false,
                true,
            ),
            Policies => (
                "Policies",
                &["title", "policy_type"],
                Some("created_on"),
                &[],
                None,
                false,
                true,
            ),
        };

        // Transaction reports carry no row status
        let filter = match kind {
            Income | Profit | Returns => FilterSpec::new(search, date, facets).without_status(),
            _ => FilterSpec::new(search, date, facets),
        };

        Self {
            kind,
            title,
            routes: FeatureRoutes::defaults(kind),
            filter,
            amount_field: amount,
            range_bounded,
            mutable,
        }
    }
}

/// All feature configs, with optional route overrides applied.
#[derive(Debug, Clone)]
pub struct FeatureRegistry {
    features: HashMap<FeatureKind, FeatureConfig>,
}

impl FeatureRegistry {
    pub fn builtin() -> Self {
        Self {
            features: FeatureKind::ALL
                .into_iter()
                .map(|k| (k, FeatureConfig::builtin(k)))
                .collect(),
        }
    }

    /// Apply overrides keyed by feature slug. Unknown slugs are an error.
    pub fn with_overrides(mut self, overrides: HashMap<String, RoutesPatch>) -> Result<Self> {
        for (slug, patch) in overrides {
            let kind = FeatureKind::from_slug(&slug)
                .with_context(|| format!("Unknown feature '{}' in route overrides", slug))?;
            if let Some(config) = self.features.get_mut(&kind) {
                config.routes.apply(patch);
            }
        }
        Ok(self)
    }

    pub fn load(routes_file: Option<&Path>) -> Result<Self> {
        let registry = Self::builtin();
        let Some(path) = routes_file else {
            return Ok(registry);
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let overrides: HashMap<String, RoutesPatch> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid route overrides in {}", path.display()))?;

        tracing::info!(path = %path.display(), features = overrides.len(), "Loaded upstream route overrides");
        registry.with_overrides(overrides)
    }

    pub fn get(&self, kind: FeatureKind) -> &FeatureConfig {
        // Every kind is inserted by `builtin`
        &self.features[&kind]
    }

    pub fn by_slug(&self, slug: &str) -> Option<&FeatureConfig> {
        FeatureKind::from_slug(slug).map(|k| self.get(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureConfig> {
        FeatureKind::ALL.into_iter().map(move |k| self.get(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_round_trip() {
        for kind in FeatureKind::ALL {
            assert_eq!(FeatureKind::from_slug(kind.slug()), Some(kind));
        }
        assert_eq!(FeatureKind::from_slug("unknown"), None);
    }

    #[test]
    fn reports_are_read_only_and_summed() {
        let registry = FeatureRegistry::builtin();
        for kind in [FeatureKind::Income, FeatureKind::Profit, FeatureKind::Returns] {
            let config = registry.get(kind);
            assert!(!config.mutable);
            assert!(config.amount_field.is_some());
            assert!(config.range_bounded);
        }
        assert!(registry.get(FeatureKind::CrmLinks).mutable);
    }

    #[test]
    fn overrides_patch_only_given_routes() {
        let overrides: HashMap<String, RoutesPatch> = serde_json::from_str(
            r#"{"crm_links": {"list": "/api/admin/9f2c1a", "list_method": "get"}}"#,
        )
        .unwrap();
        let registry = FeatureRegistry::builtin().with_overrides(overrides).unwrap();
        let routes = &registry.get(FeatureKind::CrmLinks).routes;
        assert_eq!(routes.list, "/api/admin/9f2c1a");
        assert_eq!(routes.list_method, ListMethod::Get);
        assert_eq!(routes.delete, "/api/admin/crm_links/delete");
    }

    #[test]
    fn unknown_override_slug_is_rejected() {
        let overrides = HashMap::from([("nope".to_string(), RoutesPatch::default())]);
        assert!(FeatureRegistry::builtin().with_overrides(overrides).is_err());
    }
}
