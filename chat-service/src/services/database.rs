//! MongoDB-backed persistence for chat transcripts.
//!
//! The collection is append-only from this service's perspective: records
//! are inserted once and never updated or deleted.

use crate::models::{ChatRecord, TurnRecord};
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOptions, IndexOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

const RECORDS_COLLECTION: &str = "chatrecords";

#[derive(Clone)]
pub struct ChatDb {
    client: MongoClient,
    db: Database,
}

impl ChatDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        // (session_id, timestamp) serves the per-session history query.
        let session_time_index = IndexModel::builder()
            .keys(doc! { "session_id": 1, "timestamp": 1 })
            .options(
                IndexOptions::builder()
                    .name("session_time_idx".to_string())
                    .build(),
            )
            .build();

        self.records()
            .create_index(session_time_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create session_time index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    // Collection accessors

    pub fn records(&self) -> Collection<ChatRecord> {
        self.db.collection(RECORDS_COLLECTION)
    }

    fn history(&self) -> Collection<TurnRecord> {
        self.db.collection(RECORDS_COLLECTION)
    }

    // Record operations

    pub async fn insert_record(&self, record: &ChatRecord) -> Result<(), AppError> {
        self.records().insert_one(record, None).await.map_err(|e| {
            tracing::error!("Failed to insert chat record: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        Ok(())
    }

    pub async fn find_history(&self, session_id: &str) -> Result<Vec<TurnRecord>, AppError> {
        let options = FindOptions::builder()
            .projection(doc! { "_id": 0, "user_message": 1, "bot_response": 1, "timestamp": 1 })
            .sort(doc! { "timestamp": 1 })
            .build();

        let cursor = self
            .history()
            .find(doc! { "session_id": session_id }, options)
            .await
            .map_err(|e| {
                tracing::error!("Failed to query chat history: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        let records: Vec<TurnRecord> = cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to collect chat history: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;

        Ok(records)
    }
}

/// Degradable wrapper around [`ChatDb`]: a missing URI or failed connection
/// yields a disconnected store, and the chat keeps working without
/// durability.
#[derive(Clone)]
pub struct TurnStore {
    inner: Option<ChatDb>,
}

impl TurnStore {
    pub async fn connect(uri: Option<&str>, database: &str) -> Self {
        let Some(uri) = uri else {
            tracing::warn!("MONGODB_URI not configured; chat transcript persistence disabled");
            return Self { inner: None };
        };

        match ChatDb::connect(uri, database).await {
            Ok(db) => {
                if let Err(e) = db.initialize_indexes().await {
                    tracing::warn!(error = %e, "Failed to create chat record indexes");
                }
                Self { inner: Some(db) }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "MongoDB connection failed; chat transcript persistence disabled"
                );
                Self { inner: None }
            }
        }
    }

    /// A store with no backing connection. Every write reports `false` and
    /// every read returns empty.
    pub fn disconnected() -> Self {
        Self { inner: None }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }

    /// Insert one turn-pair record. `Ok(false)` when the store is
    /// disconnected.
    pub async fn append_turn(&self, record: ChatRecord) -> Result<bool, AppError> {
        let Some(db) = &self.inner else {
            return Ok(false);
        };
        db.insert_record(&record).await?;
        Ok(true)
    }

    /// Records for one session in ascending timestamp order; empty when the
    /// store is disconnected or nothing was recorded.
    pub async fn fetch_history(&self, session_id: &str) -> Result<Vec<TurnRecord>, AppError> {
        let Some(db) = &self.inner else {
            return Ok(Vec::new());
        };
        db.find_history(session_id).await
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        match &self.inner {
            Some(db) => db.health_check().await,
            None => Ok(()),
        }
    }
}
