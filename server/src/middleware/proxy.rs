use actix_web::{http::header::HeaderMap, HttpRequest};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Whether the client reached us over HTTPS.
///
/// With at least one trusted proxy hop the protocol comes from the first
/// `X-Forwarded-Proto` entry; otherwise only a TLS listener counts.
pub fn request_is_secure(req: &HttpRequest, trust_proxy_hops: usize) -> bool {
    if trust_proxy_hops > 0 {
        if let Some(proto) = forwarded_proto(req.headers()) {
            return proto.eq_ignore_ascii_case("https");
        }
    }

    req.app_config().secure()
}

fn forwarded_proto(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(X_FORWARDED_PROTO)?.to_str().ok()?;
    raw.split(',').next().map(str::trim).filter(|p| !p.is_empty())
}
