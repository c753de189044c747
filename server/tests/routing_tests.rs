mod common;

use std::sync::Arc;

use actix_web::{
    dev::ServiceResponse,
    http::{header, Method, StatusCode},
    test,
};
use serde_json::json;

use common::{login_request, session_cookie, test_state, ORIGIN};
use peach_server::build_app;
use peach_server::middleware::cors::{ALLOWED_HEADERS, ALLOWED_METHODS};
use peach_server::monitor::StoreMonitor;
use peach_server::session::MemorySessionStore;

#[actix_web::test]
async fn test_parent_router_reached_without_session() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    for uri in ["/api/v1/parents", "/api/v1/parents/"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "GET {}", uri);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }
}

#[actix_web::test]
async fn test_protected_routes_require_login() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    let requests = [
        test::TestRequest::get().uri("/api/v1/children"),
        test::TestRequest::post().uri("/api/v1/children"),
        test::TestRequest::get().uri("/api/v1/children/not-an-id"),
        test::TestRequest::get().uri("/api/v1/allergens"),
        test::TestRequest::delete().uri("/api/v1/allergens/not-an-id"),
        test::TestRequest::post().uri("/api/v1/parents/logout"),
    ];

    for req in requests {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

fn header_str<B>(resp: &ServiceResponse<B>, name: header::HeaderName) -> Option<&str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

fn assert_cors_headers<B>(resp: &ServiceResponse<B>) {
    assert_eq!(header_str(resp, header::ACCESS_CONTROL_ALLOW_ORIGIN), Some(ORIGIN));
    assert_eq!(header_str(resp, header::ACCESS_CONTROL_ALLOW_CREDENTIALS), Some("true"));
    assert_eq!(header_str(resp, header::ACCESS_CONTROL_ALLOW_HEADERS), Some(ALLOWED_HEADERS));
    assert_eq!(header_str(resp, header::ACCESS_CONTROL_ALLOW_METHODS), Some(ALLOWED_METHODS));
}

#[actix_web::test]
async fn test_unknown_route_is_json_404() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    let req = test::TestRequest::get().uri("/api/v2/anything").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_cors_headers(&resp);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "route not found");
}

#[actix_web::test]
async fn test_unrouted_method_still_gets_cors_headers() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    let req = test::TestRequest::default()
        .method(Method::PATCH)
        .uri("/api/v1/parents")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_client_error());
    assert_cors_headers(&resp);
}

#[actix_web::test]
async fn test_router_responses_get_cors_headers() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    let req = test::TestRequest::get().uri("/api/v1/parents/").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_cors_headers(&resp);
}

#[actix_web::test]
async fn test_malformed_ids_are_not_found() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    let resp = test::call_service(&app, login_request().to_request()).await;
    let cookie = session_cookie(&resp).unwrap();

    for uri in ["/api/v1/children/123", "/api/v1/allergens/xyz"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET {}", uri);
    }
}

#[actix_web::test]
async fn test_invalid_bodies_rejected_before_storage() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    let resp = test::call_service(&app, login_request().to_request()).await;
    let cookie = session_cookie(&resp).unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/children")
        .cookie(cookie.clone())
        .set_json(json!({ "last_name": "Doe" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Validation error: first_name is required");

    let req = test::TestRequest::post()
        .uri("/api/v1/allergens")
        .cookie(cookie.clone())
        .set_json(json!({ "name": "peanuts", "child_id": "nope" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri("/api/v1/children/65f1c0ffee0000000000abcd")
        .cookie(cookie)
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_registration_validation() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    let cases = [
        json!({ "password": "long enough", "first_name": "A", "last_name": "B" }),
        json!({ "username": "peachdad", "password": "short", "first_name": "A", "last_name": "B" }),
        json!({ "username": "peachdad", "password": "long enough", "last_name": "B" }),
        json!({ "username": "peachdad", "password": "long enough", "first_name": "A", "last_name": "B", "email": "nope" }),
    ];

    for case in cases {
        let req = test::TestRequest::post()
            .uri("/api/v1/parents")
            .set_json(case)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let app = test::init_service(build_app(
        test_state(Arc::new(MemorySessionStore::new()), StoreMonitor::new()).await,
    ))
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/parents/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"username\":")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}
