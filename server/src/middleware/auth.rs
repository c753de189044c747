use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    HttpMessage,
};

use crate::auth::{passport, Identity};
use crate::error::AppError;
use crate::session::Session;

/// Attaches the logged-in parent, if any, to the request.
///
/// Must sit inside the session layer: it reads the identity the login
/// handler serialized into the session. It never rejects a request on its
/// own; a missing session layer is rendered as a `500` response.
pub async fn identity_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    let session = req.extensions().get::<Session>().cloned();
    let session = match session {
        Some(session) => session,
        None => {
            return Ok(req.error_response(AppError::Internal(
                "identity layer requires the session layer".to_string(),
            )))
        }
    };

    match passport::user_from(&session) {
        Ok(Some(parent_id)) => {
            req.extensions_mut().insert(Identity(parent_id));
        }
        Ok(None) => {}
        Err(err) => return Ok(req.error_response(err)),
    }

    Ok(next.call(req).await?.map_into_boxed_body())
}
