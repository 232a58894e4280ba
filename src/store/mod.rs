//! # Store Module
//!
//! Document store access for persisted readings.
//!
//! This module handles:
//! - Acquiring one long-lived MongoDB connection at startup ([`StoreConnection`])
//! - Health-checking that connection with a `ping` command
//! - A minimal [`DocumentStore`] seam so the persister can be tested without a server
//! - Converting records into documents and writing them ([`persister`])

pub mod persister;

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::StoreError;

pub use persister::Persister;

/// Anything that can accept one document per call
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a single document
    async fn insert_one(&self, document: Document) -> Result<(), StoreError>;
}

/// MongoDB collection handle implementing [`DocumentStore`]
#[derive(Debug, Clone)]
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, document: Document) -> Result<(), StoreError> {
        let result = self
            .collection
            .insert_one(document)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        debug!("Inserted document {}", result.inserted_id);
        Ok(())
    }
}

/// Long-lived connection to the configured database
///
/// Owns the connection policy; the persister only ever sees a
/// [`DocumentStore`] handle.
#[derive(Debug, Clone)]
pub struct StoreConnection {
    database: Database,
    collection_name: String,
}

impl StoreConnection {
    /// Connect and verify the server answers a `ping`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the URI is invalid or the server
    /// cannot be reached.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use meter_bridge::config::StoreConfig;
    /// use meter_bridge::store::StoreConnection;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let config = StoreConfig {
    ///         uri: "mongodb://localhost:27017".to_string(),
    ///         database: "energy".to_string(),
    ///         collection: "readings".to_string(),
    ///     };
    ///     let connection = StoreConnection::connect(&config).await?;
    ///     let _store = connection.store();
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let connection = Self {
            database: client.database(&config.database),
            collection_name: config.collection.clone(),
        };
        connection.ping().await?;

        info!(
            "Connected to MongoDB (database: {}, collection: {})",
            config.database, config.collection
        );
        Ok(connection)
    }

    /// Round-trip a `ping` command to the server
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }

    /// Handle on the configured collection
    pub fn store(&self) -> MongoStore {
        MongoStore::new(self.database.collection::<Document>(&self.collection_name))
    }
}
