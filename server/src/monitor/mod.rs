pub mod health;

pub use health::{StoreFailure, StoreHealthSnapshot, StoreMonitor};
