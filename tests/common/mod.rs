#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

use linkpage::db;
use linkpage::db::enums::Plan;
use linkpage::server::config::ServerConfig;
use linkpage::services::notifier::{NotifyError, VerificationNotifier};
use linkpage::services::payments::{PaymentError, PaymentVerifier, ReferenceVerifier};
use linkpage::web::{create_axum_router, AppState};

pub const BOOTSTRAP_KEY: &str = "bootstrap-admin-key";
pub const PASSWORD: &str = "correct horse battery";

/// Keeps every verification link instead of delivering it. With `fail` set
/// the link is still kept but delivery is reported as failed.
#[derive(Default)]
pub struct RecordingNotifier {
    pub urls: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        RecordingNotifier {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl VerificationNotifier for RecordingNotifier {
    async fn send_verification(
        &self,
        _email: &str,
        _username: &str,
        verify_url: &str,
    ) -> Result<(), NotifyError> {
        self.urls.lock().unwrap().push(verify_url.to_string());
        if self.fail {
            return Err(NotifyError::DeliveryFailed("smtp relay refused connection".to_string()));
        }
        Ok(())
    }
}

/// A payment provider that cannot be reached.
pub struct UnavailableVerifier;

#[async_trait]
impl PaymentVerifier for UnavailableVerifier {
    async fn verify(&self, _reference: &str, _plan: Plan, _amount: i64) -> Result<bool, PaymentError> {
        Err(PaymentError::ProviderUnavailable("gateway timed out".to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub notifier: Arc<RecordingNotifier>,
    _dir: TempDir,
}

pub fn test_config(database_url: String) -> ServerConfig {
    ServerConfig {
        database_url,
        listen_addr: "127.0.0.1:0".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        app_url: "http://localhost:3000".to_string(),
        log_dir: "logs".to_string(),
        db_max_connections: 1,
        password_hash_cost: 4,
        token_ttl_hours: 1,
        admin_bootstrap_key: Some(BOOTSTRAP_KEY.to_string()),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(RecordingNotifier::default(), Arc::new(ReferenceVerifier)).await
    }

    pub async fn spawn_with(
        notifier: RecordingNotifier,
        payment_verifier: Arc<dyn PaymentVerifier>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("app.db").display());
        let config = test_config(url);

        let db_pool = db::connect(&config.database_url, config.db_max_connections)
            .await
            .unwrap();
        db::ensure_schema(&db_pool).await.unwrap();

        let notifier = Arc::new(notifier);
        let state = Arc::new(AppState {
            db_pool,
            config: Arc::new(config),
            notifier: notifier.clone(),
            payment_verifier,
        });
        let router = create_axum_router(state.clone());

        TestApp {
            router,
            state,
            notifier,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a JSON request, optionally with a bearer token, and decodes the
    /// JSON reply. Empty bodies decode to `Value::Null`.
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let auth = token.map(|token| ("authorization", format!("Bearer {token}")));
        self.call(build_request(method, uri, auth, body)).await
    }

    /// Same as `json`, authenticated with an admin API key instead.
    pub async fn admin(
        &self,
        method: Method,
        uri: &str,
        key: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let auth = Some(("x-api-key", key.to_string()));
        self.call(build_request(method, uri, auth, body)).await
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.send(request).await;
        let status = response.status();
        (status, read_json(response).await)
    }

    pub fn last_verification_token(&self) -> String {
        let urls = self.notifier.urls.lock().unwrap();
        let url = urls.last().expect("no verification message was sent");
        url.rsplit('/').next().unwrap().to_string()
    }

    pub async fn signup(&self, username: &str) -> StatusCode {
        let (status, _) = self
            .json(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                })),
            )
            .await;
        status
    }

    pub async fn login(&self, username: &str) -> (StatusCode, Value) {
        self.json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(serde_json::json!({
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
            })),
        )
        .await
    }

    /// Signs up, verifies and logs in; returns the bearer token.
    pub async fn register_verified(&self, username: &str) -> String {
        assert_eq!(self.signup(username).await, StatusCode::CREATED);
        let token = self.last_verification_token();
        let (status, _) = self
            .json(Method::POST, &format!("/api/auth/verify/{token}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self.login(username).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn create_link(&self, token: &str, title: &str) -> i64 {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/links",
                Some(token),
                Some(serde_json::json!({
                    "title": title,
                    "url": format!("https://example.com/{title}"),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }

    /// Link titles of the caller in display order.
    pub async fn link_titles(&self, token: &str) -> Vec<String> {
        let (status, body) = self.json(Method::GET, "/api/links", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array()
            .unwrap()
            .iter()
            .map(|link| link["title"].as_str().unwrap().to_string())
            .collect()
    }
}

fn build_request(
    method: Method,
    uri: &str,
    auth: Option<(&str, String)>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((name, value)) = auth {
        builder = builder.header(name, value);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}
