pub mod passport;
pub mod strategy;

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use mongodb::bson::oid::ObjectId;

use crate::error::AppError;
pub use strategy::{CredentialStrategy, LocalStrategy};

/// The logged-in parent, attached by the identity middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub ObjectId);

/// Extractor for handlers that require a login; rejects with `401`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedParent {
    pub id: ObjectId,
}

impl FromRequest for AuthenticatedParent {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .map(|identity| AuthenticatedParent { id: identity.0 })
                .ok_or_else(|| AppError::Unauthorized.into()),
        )
    }
}
