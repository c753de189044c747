mod common;

use std::sync::Arc;

use actix_web::{
    http::{header, StatusCode},
    test,
};

use common::{offline_db, session_layer, test_state, StaticStrategy, ORIGIN};
use peach_server::middleware::cors::{ALLOWED_HEADERS, ALLOWED_METHODS};
use peach_server::middleware::CorsPolicy;
use peach_server::monitor::StoreMonitor;
use peach_server::session::MemorySessionStore;
use peach_server::{build_app, AppState};

fn header_value<B>(resp: &actix_web::dev::ServiceResponse<B>, name: header::HeaderName) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[actix_web::test]
async fn test_preflight_short_circuits_with_no_content() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    // Protected route, no session: the pre-flight must not reach auth.
    let req = test::TestRequest::default()
        .method(actix_web::http::Method::OPTIONS)
        .uri("/api/v1/children")
        .insert_header((header::ORIGIN, ORIGIN))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(header_value(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN), ORIGIN);
    assert_eq!(header_value(&resp, header::ACCESS_CONTROL_ALLOW_CREDENTIALS), "true");
    assert_eq!(header_value(&resp, header::ACCESS_CONTROL_ALLOW_HEADERS), ALLOWED_HEADERS);
    assert_eq!(header_value(&resp, header::ACCESS_CONTROL_ALLOW_METHODS), ALLOWED_METHODS);

    let body = test::read_body(resp).await;
    assert!(body.is_empty());
}

#[actix_web::test]
async fn test_headers_on_regular_responses() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_value(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN), ORIGIN);
    assert_eq!(header_value(&resp, header::ACCESS_CONTROL_ALLOW_CREDENTIALS), "true");
}

#[actix_web::test]
async fn test_headers_on_error_responses() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/children")
        .insert_header((header::ORIGIN, "https://elsewhere.example"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    // A single allowed origin is sent regardless of the caller.
    assert_eq!(header_value(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN), ORIGIN);
}

#[actix_web::test]
async fn test_configured_origins_are_echoed() {
    let state = AppState::with_strategy(
        offline_db().await,
        session_layer(Arc::new(MemorySessionStore::new()), true, StoreMonitor::new()),
        Arc::new(StaticStrategy::new()),
        CorsPolicy::new(&[ORIGIN, "http://localhost:3000"]).unwrap(),
    );
    let app = test::init_service(build_app(state)).await;

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header((header::ORIGIN, "http://localhost:3000"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(
        header_value(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN),
        "http://localhost:3000"
    );
    assert_eq!(header_value(&resp, header::VARY), "Origin");
}
