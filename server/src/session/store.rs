use std::time::Duration;

use async_trait::async_trait;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use serde::{Deserialize, Serialize};

use crate::db::database_for;
use crate::error::{AppError, Result};
use crate::monitor::StoreMonitor;

/// A persisted session: id, absolute expiry and the opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub expires: BsonDateTime,
    pub session: Document,
}

impl SessionRecord {
    pub fn new(id: String, session: Document, max_age: Duration) -> Self {
        let expires_at = BsonDateTime::now().timestamp_millis() + max_age.as_millis() as i64;
        Self {
            id,
            expires: BsonDateTime::from_millis(expires_at),
            session,
        }
    }

    pub fn is_expired(&self) -> bool {
        BsonDateTime::now() >= self.expires
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the record for `id` unless it is missing or expired.
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>>;

    async fn save(&self, record: &SessionRecord) -> Result<()>;

    async fn destroy(&self, id: &str) -> Result<()>;
}

fn store_error(err: mongodb::error::Error) -> AppError {
    AppError::SessionStore(err.to_string())
}

/// Sessions kept in a collection of the primary database.
#[derive(Clone)]
pub struct MongoSessionStore {
    collection: Collection<SessionRecord>,
}

impl MongoSessionStore {
    /// Builds a store with its own driver client. The client connects lazily,
    /// so this does not wait for the deployment. The TTL index is created in
    /// the background and failures go to `monitor`.
    pub async fn connect(
        url: &str,
        database_name: Option<&str>,
        collection: &str,
        monitor: StoreMonitor,
    ) -> Result<Self> {
        let client = Client::with_uri_str(url).await.map_err(store_error)?;
        let store = Self::new(database_for(&client, database_name).collection(collection));

        let index_store = store.clone();
        tokio::spawn(async move {
            match index_store.init_indexes().await {
                Ok(()) => log::debug!("Session TTL index ready"),
                Err(err) => monitor.report(&err),
            }
        });

        Ok(store)
    }

    pub fn new(collection: Collection<SessionRecord>) -> Self {
        Self { collection }
    }

    pub async fn init_indexes(&self) -> Result<()> {
        let expires_index = IndexModel::builder()
            .keys(doc! { "expires": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(Duration::from_secs(0))
                    .build(),
            )
            .build();

        self.collection
            .create_index(expires_index)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MongoSessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionRecord>> {
        let record = self
            .collection
            .find_one(doc! { "_id": id, "expires": { "$gt": BsonDateTime::now() } })
            .await
            .map_err(store_error)?;
        Ok(record)
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": record.id.as_str() }, record)
            .upsert(true)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        self.collection
            .delete_one(doc! { "_id": id })
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
