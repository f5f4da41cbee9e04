//! Store access for the books collection.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use bson::oid::ObjectId;

use bookstore_db::StoreResult;
use bookstore_kernel::settings::{DatabaseSettings, StoreBackend};

use super::{
    memory::InMemoryBookRepository,
    models::{Book, BookFields, SearchCriteria},
    mongo::MongoBookRepository,
};

/// Number of entries returned by the reporting endpoints.
pub const REPORT_LIMIT: usize = 5;

pub type SharedRepository = Arc<dyn BookRepository>;

/// One store round-trip per operation.
///
/// Implementations must give `purchase` single-document atomicity: no reader
/// may observe `stock` changed without `sold_items`, or the reverse.
#[async_trait]
pub trait BookRepository: Send + Sync + Debug {
    /// Create the `title` and `author` indexes. Idempotent.
    async fn ensure_indexes(&self) -> StoreResult<()>;

    /// Every book, in the store's natural order.
    async fn list(&self) -> StoreResult<Vec<Book>>;

    async fn get(&self, id: ObjectId) -> StoreResult<Option<Book>>;

    /// Insert a new book and return the identifier the store assigned.
    async fn insert(&self, fields: BookFields) -> StoreResult<ObjectId>;

    /// Overwrite every field of the book with `id`.
    ///
    /// Returns whether a document was modified: an unknown id and a write that
    /// changes nothing both answer `false`.
    async fn update(&self, id: ObjectId, fields: BookFields) -> StoreResult<bool>;

    /// Returns whether a book was removed.
    async fn delete(&self, id: ObjectId) -> StoreResult<bool>;

    async fn search(&self, criteria: &SearchCriteria) -> StoreResult<Vec<Book>>;

    /// Authors with the most books, most first, ties by name.
    async fn top_authors(&self, limit: usize) -> StoreResult<Vec<String>>;

    /// Titles with the highest total `sold_items`, highest first, ties by title.
    async fn top_selling_titles(&self, limit: usize) -> StoreResult<Vec<String>>;

    async fn count(&self) -> StoreResult<u64>;

    /// Decrement `stock` and increment `sold_items` by one in a single update.
    /// Neither existence nor stock level is checked.
    async fn purchase(&self, id: ObjectId) -> StoreResult<()>;

    /// Release the store connection.
    async fn shutdown(&self) -> StoreResult<()>;
}

/// Open the repository selected by `database.backend`.
pub async fn open(settings: &DatabaseSettings) -> StoreResult<SharedRepository> {
    match settings.backend {
        StoreBackend::Mongodb => {
            let client = bookstore_db::connect(settings).await?;
            let database = bookstore_db::database(&client, settings);
            Ok(Arc::new(MongoBookRepository::new(
                client,
                database.collection(&settings.collection),
            )))
        }
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory book store; data is lost on exit");
            Ok(Arc::new(InMemoryBookRepository::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_memory_backend() {
        let settings = DatabaseSettings {
            backend: StoreBackend::Memory,
            ..DatabaseSettings::default()
        };
        let repository = open(&settings).await.unwrap();
        assert_eq!(repository.count().await.unwrap(), 0);
    }
}
