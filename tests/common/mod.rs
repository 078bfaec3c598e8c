#![allow(dead_code)]

use adminportal_bff::{
    app::{create_app, AppState},
    auth::{Claims, TokenVerifier},
    config::{EnvelopeMode, Environment, Settings},
    domain::FeatureRegistry,
    services::{
        envelope::{AesGcmEnvelope, EnvelopeCodec},
        ReportCache, UpstreamClient,
    },
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const ENVELOPE_SECRET: &str = "integration-envelope-secret";
pub const JWT_SECRET: &str = "integration-jwt-secret";

/// One request the fake upstream received, already decrypted.
#[derive(Debug, Clone)]
pub struct Seen {
    pub feature: String,
    pub op: String,
    pub body: Value,
}

/// In-process stand-in for the remote admin API.
pub struct FakeUpstream {
    codec: AesGcmEnvelope,
    pub rows: Mutex<Vec<Value>>,
    pub report: Mutex<Option<Value>>,
    pub seen: Mutex<Vec<Seen>>,
    /// When set, every call answers with this envelope status and message
    pub reject_with: Mutex<Option<(u16, String)>>,
    /// When set, every call answers with this raw envelope
    pub reject_envelope: Mutex<Option<Value>>,
    /// When set, list responses carry undecryptable data
    pub corrupt_lists: Mutex<bool>,
}

impl FakeUpstream {
    pub fn new(rows: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            codec: AesGcmEnvelope::from_secret(ENVELOPE_SECRET),
            rows: Mutex::new(rows),
            report: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
            reject_with: Mutex::new(None),
            reject_envelope: Mutex::new(None),
            corrupt_lists: Mutex::new(false),
        })
    }

    pub fn calls(&self, op: &str) -> Vec<Seen> {
        self.seen
            .lock()
            .iter()
            .filter(|s| s.op == op)
            .cloned()
            .collect()
    }

    fn respond(&self, feature: String, op: String, body: Value) -> Json<Value> {
        self.seen.lock().push(Seen {
            feature,
            op: op.clone(),
            body,
        });

        if let Some(envelope) = self.reject_envelope.lock().clone() {
            return Json(envelope);
        }
        // real failure envelopes carry an empty, unencrypted `data`
        if let Some((status, message)) = self.reject_with.lock().clone() {
            return Json(json!({"status": status, "message": message, "data": ""}));
        }

        if op == "list" {
            if *self.corrupt_lists.lock() {
                return Json(json!({"status": 200, "data": "bm90IGEgY2lwaGVydGV4dA=="}));
            }
            let rows = Value::Array(self.rows.lock().clone());
            let data = self.codec.encode(&rows).expect("encode rows");
            let mut envelope = json!({"status": 200, "data": data});
            if let Some(report) = self.report.lock().clone() {
                envelope["report"] = report;
            }
            return Json(envelope);
        }

        let status = if op == "create" { 201 } else { 200 };
        Json(json!({"status": status, "message": "ok"}))
    }
}

#[derive(Deserialize)]
struct EnvelopeIn {
    data: String,
}

async fn fake_post(
    State(fake): State<Arc<FakeUpstream>>,
    Path((feature, op)): Path<(String, String)>,
    Json(envelope): Json<EnvelopeIn>,
) -> Json<Value> {
    let body = fake.codec.decode(&envelope.data).expect("client sent a valid envelope");
    fake.respond(feature, op, body)
}

async fn fake_get(
    State(fake): State<Arc<FakeUpstream>>,
    Path((feature, op)): Path<(String, String)>,
) -> Json<Value> {
    fake.respond(feature, op, Value::Null)
}

async fn fake_health() -> StatusCode {
    StatusCode::OK
}

/// Spawn the fake upstream on an ephemeral port and return its base URL.
pub async fn spawn_upstream(fake: Arc<FakeUpstream>) -> String {
    let router = Router::new()
        .route("/health", get(fake_health))
        .route("/api/admin/:feature/:op", post(fake_post).get(fake_get))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake upstream");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("fake upstream");
    });

    format!("http://{}", addr)
}

pub fn settings(upstream_base_url: &str) -> Settings {
    Settings {
        env: Environment::Dev,
        server_addr: "127.0.0.1:0".to_string(),
        cors_allow_origins: vec!["http://localhost:3000".to_string()],
        upstream_base_url: upstream_base_url.to_string(),
        upstream_timeout_seconds: 5,
        upstream_api_token: None,
        upstream_routes_file: None,
        envelope: EnvelopeMode::Aes {
            secret: ENVELOPE_SECRET.to_string(),
        },
        admin_jwt_secret: JWT_SECRET.to_string(),
        admin_jwt_issuer: None,
        report_cache_ttl_seconds: 60,
    }
}

pub struct TestApp {
    pub router: Router,
    pub fake: Arc<FakeUpstream>,
}

impl TestApp {
    pub async fn start(rows: Vec<Value>) -> Self {
        Self::start_with(rows, FeatureRegistry::builtin()).await
    }

    pub async fn start_with(rows: Vec<Value>, features: FeatureRegistry) -> Self {
        let fake = FakeUpstream::new(rows);
        let base_url = spawn_upstream(fake.clone()).await;
        let settings = settings(&base_url);

        let upstream = UpstreamClient::new(
            &settings.upstream_base_url,
            None,
            settings.upstream_timeout_seconds,
            Arc::new(AesGcmEnvelope::from_secret(ENVELOPE_SECRET)),
        )
        .expect("upstream client");
        let verifier = TokenVerifier::new(&settings.admin_jwt_secret, None);
        let reports = ReportCache::new(settings.report_cache_ttl_seconds);
        let state = AppState::new(settings, verifier, features, upstream, reports);

        Self {
            router: create_app(state),
            fake,
        }
    }

    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(method, uri, body, Some(&admin_token("admin"))).await
    }

    pub async fn send_as(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.call(request).await
    }

    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }
}

pub fn admin_token(role: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: "admin-7".to_string(),
        iat: now,
        exp: now + 600,
        iss: None,
        email: Some("ops@example.com".to_string()),
        role: Some(role.to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("sign token")
}

/// `YYYY-MM-DD` for a day offset from today (negative is past).
pub fn day(offset: i64) -> String {
    (chrono::Local::now().date_naive() + chrono::Duration::days(offset)).to_string()
}
