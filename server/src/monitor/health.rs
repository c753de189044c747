use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct StoreFailure {
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreHealthSnapshot {
    pub healthy: bool,
    pub failures: u64,
    pub last_failure: Option<StoreFailure>,
}

#[derive(Debug)]
struct StoreHealth {
    healthy: AtomicBool,
    failures: AtomicU64,
    last_failure: RwLock<Option<StoreFailure>>,
}

/// Supervises the session store.
///
/// Every store failure is logged at `error` level and flips the health flag
/// that `/health` reports. The next successful store operation clears the
/// flag; the failure count and the last failure are kept.
#[derive(Debug, Clone)]
pub struct StoreMonitor {
    inner: Arc<StoreHealth>,
}

impl StoreMonitor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreHealth {
                healthy: AtomicBool::new(true),
                failures: AtomicU64::new(0),
                last_failure: RwLock::new(None),
            }),
        }
    }

    pub fn report(&self, err: &AppError) {
        let failures = self.inner.failures.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.healthy.store(false, Ordering::SeqCst);

        log::error!("Session store failure #{}: {}", failures, err);

        let failure = StoreFailure {
            message: err.to_string(),
            at: Utc::now(),
        };
        match self.inner.last_failure.write() {
            Ok(mut last) => *last = Some(failure),
            Err(poisoned) => *poisoned.into_inner() = Some(failure),
        }
    }

    pub fn record_success(&self) {
        if !self.inner.healthy.swap(true, Ordering::SeqCst) {
            log::info!("Session store recovered");
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.inner.healthy.load(Ordering::SeqCst)
    }

    pub fn failure_count(&self) -> u64 {
        self.inner.failures.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> StoreHealthSnapshot {
        let last_failure = match self.inner.last_failure.read() {
            Ok(last) => last.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        StoreHealthSnapshot {
            healthy: self.is_healthy(),
            failures: self.failure_count(),
            last_failure,
        }
    }
}

impl Default for StoreMonitor {
    fn default() -> Self {
        Self::new()
    }
}
