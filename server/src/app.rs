use std::sync::Arc;

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::{from_fn, Logger, NormalizePath},
    web, App, HttpResponse,
};

use crate::auth::{CredentialStrategy, LocalStrategy};
use crate::db::MongoDbContext;
use crate::error::{AppError, Result};
use crate::handlers;
use crate::middleware::{cors_middleware, identity_middleware, CorsPolicy};
use crate::session::{session_middleware, SessionLayer};

/// Common log format, one line per request.
pub const ACCESS_LOG_FORMAT: &str = r#"%a - - %t "%r" %s %b"#;

/// Shared state handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub db: MongoDbContext,
    pub sessions: SessionLayer,
    pub strategy: Arc<dyn CredentialStrategy>,
    pub cors: CorsPolicy,
}

impl AppState {
    /// Verifies credentials against the `parents` collection.
    pub fn new(db: MongoDbContext, sessions: SessionLayer, cors: CorsPolicy) -> Self {
        let strategy = Arc::new(LocalStrategy::new(db.parents()));
        Self::with_strategy(db, sessions, strategy, cors)
    }

    pub fn with_strategy(
        db: MongoDbContext,
        sessions: SessionLayer,
        strategy: Arc<dyn CredentialStrategy>,
        cors: CorsPolicy,
    ) -> Self {
        Self {
            db,
            sessions,
            strategy,
            cors,
        }
    }
}

async fn route_not_found() -> Result<HttpResponse> {
    Err(AppError::NotFound("route"))
}

/// Builds the application.
///
/// `wrap` registers middleware inside-out, so a request meets CORS first,
/// then the access log, the session, the identity and finally the router.
pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let monitor = state.sessions.monitor().clone();

    App::new()
        .app_data(web::Data::new(state.db))
        .app_data(web::Data::new(state.sessions))
        .app_data(web::Data::from(state.strategy))
        .app_data(web::Data::new(state.cors))
        .app_data(web::Data::new(monitor))
        .app_data(handlers::json_config())
        .app_data(handlers::form_config())
        .configure(handlers::configure)
        .default_service(web::to(route_not_found))
        .wrap(NormalizePath::trim())
        .wrap(from_fn(identity_middleware))
        .wrap(from_fn(session_middleware))
        .wrap(Logger::new(ACCESS_LOG_FORMAT))
        .wrap(from_fn(cors_middleware))
}
