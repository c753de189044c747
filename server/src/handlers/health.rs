use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::error::Result;
use crate::monitor::{StoreHealthSnapshot, StoreMonitor};

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub session_store: StoreHealthSnapshot,
}

#[get("/health")]
pub async fn health_check(monitor: web::Data<StoreMonitor>) -> Result<HttpResponse> {
    let snapshot = monitor.snapshot();

    let mut builder = if snapshot.healthy {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };

    let response = HealthCheckResponse {
        status: if snapshot.healthy { "healthy" } else { "degraded" }.to_string(),
        session_store: snapshot,
    };

    Ok(builder.json(response))
}
