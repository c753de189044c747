use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::store::{SessionRecord, SessionStore};
use crate::error::Result;

/// Process-local session store, used by tests and single-instance setups.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    // session_id -> SessionRecord
    sessions: Arc<DashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>> {
        let record = match self.sessions.get(id) {
            Some(record) => record.clone(),
            None => return Ok(None),
        };

        if record.is_expired() {
            self.sessions.remove(id);
            return Ok(None);
        }

        Ok(Some(record))
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        self.sessions.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        if self.sessions.remove(id).is_some() {
            log::debug!("Destroyed session: {}", id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, Document};
    use std::time::Duration;

    fn record(id: &str, max_age: Duration) -> SessionRecord {
        SessionRecord::new(id.to_string(), doc! { "views": 1 }, max_age)
    }

    #[actix_web::test]
    async fn test_save_and_load() {
        let store = MemorySessionStore::new();
        store.save(&record("s1", Duration::from_secs(60))).await.unwrap();

        let loaded = store.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded.session.get_i32("views").unwrap(), 1);
        assert_eq!(store.active_session_count(), 1);
    }

    #[actix_web::test]
    async fn test_save_replaces_existing() {
        let store = MemorySessionStore::new();
        store.save(&record("s1", Duration::from_secs(60))).await.unwrap();

        let mut updated = record("s1", Duration::from_secs(60));
        updated.session = Document::new();
        store.save(&updated).await.unwrap();

        assert_eq!(store.active_session_count(), 1);
        assert!(store.get("s1").unwrap().session.is_empty());
    }

    #[actix_web::test]
    async fn test_destroy() {
        let store = MemorySessionStore::new();
        store.save(&record("s1", Duration::from_secs(60))).await.unwrap();

        store.destroy("s1").await.unwrap();
        assert!(store.load("s1").await.unwrap().is_none());

        // Destroying an unknown session is not an error
        store.destroy("s1").await.unwrap();
    }

    #[actix_web::test]
    async fn test_expired_session_not_loaded() {
        let store = MemorySessionStore::new();
        store.save(&record("s1", Duration::ZERO)).await.unwrap();

        std::thread::sleep(Duration::from_millis(5));

        assert!(store.load("s1").await.unwrap().is_none());
        assert_eq!(store.active_session_count(), 0);
    }
}
