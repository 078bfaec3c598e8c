use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// How request and response payloads are wrapped on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeMode {
    /// AES-256-GCM, key derived from `ENVELOPE_SECRET`
    Aes { secret: String },
    /// JSON text carried as-is (local upstreams and tests)
    Plain,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Upstream admin API
    pub upstream_base_url: String,
    pub upstream_timeout_seconds: u64,
    pub upstream_api_token: Option<String>,
    pub upstream_routes_file: Option<PathBuf>,
    pub envelope: EnvelopeMode,

    // Admin auth
    pub admin_jwt_secret: String,
    pub admin_jwt_issuer: Option<String>,

    // Snapshot cache
    pub report_cache_ttl_seconds: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Upstream admin API
        let upstream_base_url =
            env::var("UPSTREAM_BASE_URL").context("UPSTREAM_BASE_URL must be set")?;
        url::Url::parse(&upstream_base_url).context("UPSTREAM_BASE_URL is not a valid URL")?;
        let upstream_timeout_seconds = env::var("UPSTREAM_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let upstream_api_token = env::var("UPSTREAM_API_TOKEN")
            .ok()
            .filter(|s| !s.is_empty());
        let upstream_routes_file = env::var("UPSTREAM_ROUTES_FILE")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let envelope = match env::var("ENVELOPE_MODE")
            .unwrap_or_else(|_| "aes".to_string())
            .to_lowercase()
            .as_str()
        {
            "plain" => EnvelopeMode::Plain,
            "aes" => EnvelopeMode::Aes {
                secret: env::var("ENVELOPE_SECRET")
                    .context("ENVELOPE_SECRET must be set when ENVELOPE_MODE=aes")?,
            },
            other => bail!("Unknown ENVELOPE_MODE '{}', expected 'aes' or 'plain'", other),
        };

        // Admin auth
        let admin_jwt_secret =
            env::var("ADMIN_JWT_SECRET").context("ADMIN_JWT_SECRET must be set")?;
        let admin_jwt_issuer = env::var("ADMIN_JWT_ISSUER").ok().filter(|s| !s.is_empty());

        // Snapshot cache
        let report_cache_ttl_seconds = env::var("REPORT_CACHE_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            upstream_base_url,
            upstream_timeout_seconds,
            upstream_api_token,
            upstream_routes_file,
            envelope,
            admin_jwt_secret,
            admin_jwt_issuer,
            report_cache_ttl_seconds,
        })
    }
}
