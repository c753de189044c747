use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    http::{
        header::{self, HeaderMap, HeaderValue},
        Method,
    },
    middleware::Next,
    web, HttpResponse,
};

use crate::error::{AppError, Result};

pub const ALLOWED_HEADERS: &str =
    "Origin,Accept,Content-Type,Authorization,Content-Length,X-Requested-With";
pub const ALLOWED_METHODS: &str = "GET,POST,PUT,DELETE";

/// Origin allow-list for the browser client.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<HeaderValue>,
}

impl CorsPolicy {
    pub fn new<S: AsRef<str>>(origins: &[S]) -> Result<Self> {
        let origins = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.as_ref()).map_err(|_| {
                    AppError::Config(format!("invalid CORS origin '{}'", origin.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if origins.is_empty() {
            return Err(AppError::Config(
                "at least one CORS origin is required".to_string(),
            ));
        }

        Ok(Self { origins })
    }

    /// The request origin when allowed, otherwise the first configured origin.
    pub fn allow_origin_for(&self, origin: Option<&HeaderValue>) -> HeaderValue {
        origin
            .and_then(|origin| self.origins.iter().find(|allowed| *allowed == origin))
            .unwrap_or(&self.origins[0])
            .clone()
    }

    fn apply(&self, headers: &mut HeaderMap, allow_origin: HeaderValue) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        if self.origins.len() > 1 {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
    }
}

/// Outermost layer: pre-flights end here with `204`, everything else gets
/// the CORS headers on the way out, error responses included.
pub async fn cors_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> std::result::Result<ServiceResponse<BoxBody>, actix_web::Error> {
    let policy = match req.app_data::<web::Data<CorsPolicy>>().cloned() {
        Some(policy) => policy,
        None => {
            return Ok(req.error_response(AppError::Internal(
                "CORS policy not configured".to_string(),
            )))
        }
    };

    let allow_origin = policy.allow_origin_for(req.headers().get(header::ORIGIN));

    if req.method() == Method::OPTIONS {
        let mut res = HttpResponse::NoContent().finish();
        policy.apply(res.headers_mut(), allow_origin);
        return Ok(req.into_response(res));
    }

    // Inner layers render their own failures, so only responses arrive here.
    let mut res = next.call(req).await?.map_into_boxed_body();

    policy.apply(res.headers_mut(), allow_origin);
    Ok(res)
}
