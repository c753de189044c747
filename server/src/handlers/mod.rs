pub mod allergens;
pub mod children;
pub mod health;
pub mod parents;
pub mod validate;

use actix_web::web;

use crate::error::AppError;

pub use health::health_check;

/// Request bodies are accepted as JSON or URL-encoded forms.
pub type JsonOrForm<T> = web::Either<web::Json<T>, web::Form<T>>;

pub fn into_body<T>(body: JsonOrForm<T>) -> T {
    match body {
        web::Either::Left(json) => json.into_inner(),
        web::Either::Right(form) => form.into_inner(),
    }
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

pub fn form_config() -> web::FormConfig {
    web::FormConfig::default()
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(parents::scope())
        .service(children::scope())
        .service(allergens::scope());
}
