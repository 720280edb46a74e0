//! MongoDB client and collection wrapper
//!
//! Typed collections with index setup and store-error mapping.

use bson::{doc, Document};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    options::{
        ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, UpdateModifications,
    },
    results::UpdateResult,
    Client, Collection, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::info;

use crate::db::schemas::Metadata;
use crate::types::PlatformError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// True when a write was rejected by a unique index
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    let message = err.to_string();
    message.contains("E11000") || message.contains("duplicate key")
}

/// Server selection and connect bound when the URI sets none
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Handle on the platform database
#[derive(Clone)]
pub struct MongoClient {
    database: Database,
}

impl MongoClient {
    /// Connect and ping `db_name`. Fails fast when the server is unreachable
    /// so dev mode can fall back to the memory store.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, PlatformError> {
        info!("Connecting to MongoDB at {}", uri);

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| PlatformError::Store(format!("Invalid MongoDB URI: {}", e)))?;
        options.app_name = Some("signlearn".to_string());
        options.server_selection_timeout.get_or_insert(CONNECT_TIMEOUT);
        options.connect_timeout.get_or_insert(CONNECT_TIMEOUT);

        let client = Client::with_options(options)
            .map_err(|e| PlatformError::Store(format!("Failed to connect to MongoDB: {}", e)))?;
        let database = client.database(db_name);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| PlatformError::Store(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(Self { database })
    }

    /// Open a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, PlatformError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::open(self.database.collection::<T>(name)).await
    }
}

/// Typed collection whose schema indexes exist once opened
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    async fn open(inner: Collection<T>) -> Result<Self, PlatformError> {
        let models: Vec<IndexModel> = T::into_indices()
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        if !models.is_empty() {
            inner.create_indexes(models).await.map_err(|e| {
                PlatformError::Store(format!(
                    "Index setup on {} failed: {}",
                    inner.name(),
                    e
                ))
            })?;
        }

        Ok(Self { inner })
    }

    /// Insert with fresh timestamps. A unique index violation is reported as `Conflict`.
    pub async fn insert_one(&self, mut item: T) -> Result<bson::Bson, PlatformError> {
        *item.mut_metadata() = Metadata::at(Utc::now());

        match self.inner.insert_one(item).await {
            Ok(result) => Ok(result.inserted_id),
            Err(e) if is_duplicate_key(&e) => Err(PlatformError::Conflict(e.to_string())),
            Err(e) => Err(PlatformError::Store(format!("Insert failed: {}", e))),
        }
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, PlatformError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| PlatformError::Store(format!("Find failed: {}", e)))
    }

    /// Find a sorted window of documents
    pub async fn find_page(
        &self,
        filter: Document,
        sort: Document,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<T>, PlatformError> {
        let options = FindOptions::builder()
            .sort(sort)
            .skip(skip)
            .limit(limit)
            .build();

        let cursor = self
            .inner
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| PlatformError::Store(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| PlatformError::Store(format!("Cursor read failed: {}", e)))
    }

    /// Count documents matching a filter
    pub async fn count(&self, filter: Document) -> Result<u64, PlatformError> {
        self.inner
            .count_documents(filter)
            .await
            .map_err(|e| PlatformError::Store(format!("Count failed: {}", e)))
    }

    /// `$`-operator or pipeline update on the first match
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, PlatformError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| PlatformError::Store(format!("Update failed: {}", e)))
    }

    /// Atomically update one document and return it (before or after, per options)
    ///
    /// Duplicate-key failures are passed through untouched so upsert races
    /// can be told apart from I/O errors.
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
        options: FindOneAndUpdateOptions,
    ) -> Result<Option<T>, mongodb::error::Error> {
        self.inner
            .find_one_and_update(filter, update.into())
            .with_options(options)
            .await
    }

    /// Raw collection, for operations the wrapper does not cover
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

