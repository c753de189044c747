#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{cookie::Cookie, dev::ServiceResponse, test};
use async_trait::async_trait;
use chrono::Utc;
use mongodb::{bson::oid::ObjectId, Client};
use serde_json::json;

use peach_server::auth::CredentialStrategy;
use peach_server::config::AppConfig;
use peach_server::db::{models::Parent, MongoDbContext};
use peach_server::error::Result;
use peach_server::middleware::CorsPolicy;
use peach_server::monitor::StoreMonitor;
use peach_server::session::{
    CookieSettings, CookieSigner, SessionLayer, SessionStore, SESSION_COOKIE, SESSION_MAX_AGE,
};
use peach_server::AppState;

pub const SECRET: &str = "peach-test-secret-0123456789abcdef";
pub const ORIGIN: &str = "https://peachofmind.netlify.com";
pub const USERNAME: &str = "peachmom";
pub const PASSWORD: &str = "correct horse";

/// Nothing listens on port 1; the driver only notices on first use.
pub const UNREACHABLE_DB: &str = "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=300";

pub fn test_config(port: u16, database_url: &str) -> AppConfig {
    let env: HashMap<&str, String> = HashMap::from([
        ("HOST", "127.0.0.1".to_string()),
        ("PORT", port.to_string()),
        ("DATABASE_URL", database_url.to_string()),
        ("TEST_DATABASE_URL", database_url.to_string()),
        ("SESSION_SECRET", SECRET.to_string()),
        ("DATABASE_NAME", "peach_test".to_string()),
    ]);
    AppConfig::from_lookup(|key| env.get(key).cloned()).unwrap()
}

/// Accepts exactly one username/password pair without touching a database.
pub struct StaticStrategy {
    pub parent: Parent,
}

impl StaticStrategy {
    pub fn new() -> Self {
        Self {
            parent: Parent {
                id: Some(ObjectId::new()),
                username: USERNAME.to_string(),
                password_hash: String::new(),
                first_name: "Peach".to_string(),
                last_name: "Mom".to_string(),
                email: None,
                created_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl CredentialStrategy for StaticStrategy {
    async fn verify(&self, username: &str, password: &str) -> Result<Option<Parent>> {
        if username == USERNAME && password == PASSWORD {
            Ok(Some(self.parent.clone()))
        } else {
            Ok(None)
        }
    }
}

pub async fn offline_db() -> MongoDbContext {
    let client = Client::with_uri_str(UNREACHABLE_DB).await.unwrap();
    MongoDbContext::new(client, Some("peach_test"))
}

pub fn session_layer(store: Arc<dyn SessionStore>, secure: bool, monitor: StoreMonitor) -> SessionLayer {
    SessionLayer::with_settings(
        store,
        CookieSigner::new(SECRET.as_bytes()).unwrap(),
        CookieSettings {
            name: SESSION_COOKIE.to_string(),
            secure,
            max_age: SESSION_MAX_AGE,
            trust_proxy_hops: 1,
        },
        monitor,
    )
}

pub async fn test_state(store: Arc<dyn SessionStore>, monitor: StoreMonitor) -> AppState {
    AppState::with_strategy(
        offline_db().await,
        session_layer(store, true, monitor),
        Arc::new(StaticStrategy::new()),
        CorsPolicy::new(&[ORIGIN]).unwrap(),
    )
}

/// A login arriving through the TLS-terminating proxy.
pub fn login_request() -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/v1/parents/login")
        .insert_header(("X-Forwarded-Proto", "https"))
        .set_json(json!({ "username": USERNAME, "password": PASSWORD }))
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.into_owned())
}
