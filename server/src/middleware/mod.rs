pub mod auth;
pub mod cors;
pub mod proxy;

pub use auth::identity_middleware;
pub use cors::{cors_middleware, CorsPolicy};
pub use proxy::request_is_secure;
