pub mod cookie;
pub mod memory;
pub mod middleware;
pub mod state;
pub mod store;

pub use cookie::CookieSigner;
pub use memory::MemorySessionStore;
pub use middleware::{session_middleware, CookieSettings, SessionLayer, SESSION_COOKIE, SESSION_MAX_AGE};
pub use state::Session;
pub use store::{MongoSessionStore, SessionRecord, SessionStore};
