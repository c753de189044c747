use actix_web::{get, post, web, HttpResponse, Scope};
use serde::{Deserialize, Serialize};

use super::{into_body, validate, JsonOrForm};
use crate::auth::{passport, AuthenticatedParent, CredentialStrategy};
use crate::db::{models::Parent, models::ParentView, MongoDbContext};
use crate::error::{AppError, Result};
use crate::session::Session;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

pub fn scope() -> Scope {
    web::scope("/api/v1/parents")
        .service(register)
        .service(current_parent)
        .service(login)
        .service(logout)
}

#[post("")]
pub async fn register(
    body: JsonOrForm<RegisterRequest>,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    let req = into_body(body);

    let username = validate::username(req.username)?;
    let password = validate::password(req.password)?;
    let first_name = validate::required("first_name", req.first_name)?;
    let last_name = validate::required("last_name", req.last_name)?;
    let email = validate::email(req.email)?;

    log::info!("Registering parent: {}", username);

    // bcrypt is CPU-bound
    let parent = web::block(move || Parent::new(username, &password, first_name, last_name, email))
        .await??;
    let parent = db.parents().insert(parent).await?;

    log::info!("Parent registered: {}", parent.username);

    Ok(HttpResponse::Created().json(ParentView::from(&parent)))
}

#[post("/login")]
pub async fn login(
    body: JsonOrForm<LoginRequest>,
    strategy: web::Data<dyn CredentialStrategy>,
    session: Session,
) -> Result<HttpResponse> {
    let req = into_body(body);

    let username = validate::required("username", req.username)?.to_ascii_lowercase();
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".to_string()))?;

    log::info!("Login attempt for parent: {}", username);

    let parent = match strategy.verify(&username, &password).await? {
        Some(parent) => parent,
        None => {
            log::warn!("Failed login attempt for parent: {}", username);
            return Err(AppError::InvalidCredentials);
        }
    };

    let parent_id = parent
        .id
        .ok_or_else(|| AppError::Internal("stored parent has no id".to_string()))?;
    passport::log_in(&session, &parent_id)?;

    log::info!("Successful login for parent: {}", username);

    Ok(HttpResponse::Ok().json(ParentView::from(&parent)))
}

#[post("/logout")]
pub async fn logout(parent: AuthenticatedParent, session: Session) -> Result<HttpResponse> {
    passport::log_out(&session);

    log::info!("Parent {} logged out", parent.id.to_hex());

    Ok(HttpResponse::Ok().json(LogoutResponse {
        success: true,
        message: "Logout successful".to_string(),
    }))
}

#[get("")]
pub async fn current_parent(
    parent: AuthenticatedParent,
    db: web::Data<MongoDbContext>,
) -> Result<HttpResponse> {
    // A session can outlive its account.
    let parent = db
        .parents()
        .find_by_id(&parent.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(HttpResponse::Ok().json(ParentView::from(&parent)))
}
