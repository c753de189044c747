pub mod models;
pub mod repository;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mongodb::{bson::doc, Client, Database};

use crate::error::Result;
pub use repository::{AllergenRepository, ChildRepository, ParentRepository};

pub const DEFAULT_DATABASE: &str = "peach";

/// Picks the explicit database name, else the one in the connection string,
/// else [`DEFAULT_DATABASE`].
pub fn database_for(client: &Client, database_name: Option<&str>) -> Database {
    match database_name {
        Some(name) => client.database(name),
        None => client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE)),
    }
}

/// Clones share the driver client and the disconnected flag.
#[derive(Clone)]
pub struct MongoDbContext {
    client: Client,
    db: Database,
    disconnected: Arc<AtomicBool>,
}

impl MongoDbContext {
    pub fn new(client: Client, database_name: Option<&str>) -> Self {
        let db = database_for(&client, database_name);
        Self {
            client,
            db,
            disconnected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Opens a client and verifies the deployment is reachable.
    pub async fn connect(url: &str, database_name: Option<&str>) -> Result<Self> {
        let client = Client::with_uri_str(url).await?;
        let context = Self::new(client, database_name);

        if let Err(err) = context.ping().await {
            context.disconnect().await;
            return Err(err);
        }

        Ok(context)
    }

    pub async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Shuts the client down; every clone sees [`Self::is_disconnected`].
    pub async fn disconnect(self) {
        self.client.shutdown().await;
        self.disconnected.store(true, Ordering::SeqCst);
        log::info!("Disconnected from MongoDB");
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    pub fn database_name(&self) -> &str {
        self.db.name()
    }

    pub fn parents(&self) -> ParentRepository {
        ParentRepository::new(self.db.collection("parents"))
    }

    pub fn children(&self) -> ChildRepository {
        ChildRepository::new(self.db.collection("children"))
    }

    pub fn allergens(&self) -> AllergenRepository {
        AllergenRepository::new(self.db.collection("allergens"))
    }

    pub async fn init_indexes(&self) -> Result<()> {
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        // Create unique index on username
        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.db
            .collection::<models::Parent>("parents")
            .create_index(username_index)
            .await?;

        let parent_index = IndexModel::builder().keys(doc! { "parent_id": 1 }).build();

        self.db
            .collection::<models::Child>("children")
            .create_index(parent_index)
            .await?;

        let child_index = IndexModel::builder().keys(doc! { "child_id": 1 }).build();

        self.db
            .collection::<models::Allergen>("allergens")
            .create_index(child_index)
            .await?;

        log::info!("Database indexes created successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn offline_client(url: &str) -> Client {
        Client::with_uri_str(url).await.unwrap()
    }

    #[actix_web::test]
    async fn test_database_name_fallbacks() {
        let client = offline_client("mongodb://127.0.0.1:1/kids").await;

        assert_eq!(MongoDbContext::new(client.clone(), Some("other")).database_name(), "other");
        assert_eq!(MongoDbContext::new(client, None).database_name(), "kids");

        let client = offline_client("mongodb://127.0.0.1:1").await;
        assert_eq!(MongoDbContext::new(client, None).database_name(), DEFAULT_DATABASE);
    }

    #[actix_web::test]
    async fn test_disconnect_is_visible_to_clones() {
        let client = offline_client("mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200").await;
        let context = MongoDbContext::new(client, None);
        let observer = context.clone();

        assert!(!observer.is_disconnected());
        context.disconnect().await;
        assert!(observer.is_disconnected());
    }
}
