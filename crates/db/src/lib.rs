//! MongoDB client factory, index bootstrap and identifier helpers.

use bson::{doc, oid::ObjectId};
use mongodb::{options::ClientOptions, Client, Collection, Database, IndexModel};
use thiserror::Error;

use bookstore_kernel::settings::DatabaseSettings;

/// Errors raised while talking to the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection string could not be parsed or the client could not be built.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The store rejected or failed a read or write.
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// An identifier string that is not a 24-digit hex ObjectId.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not a valid ObjectId")]
pub struct InvalidObjectId(pub String);

/// Parse the external string form of a document identifier.
pub fn parse_object_id(raw: &str) -> Result<ObjectId, InvalidObjectId> {
    ObjectId::parse_str(raw).map_err(|_| InvalidObjectId(raw.to_string()))
}

/// Create the process-wide client. The driver pools connections internally.
pub async fn connect(settings: &DatabaseSettings) -> StoreResult<Client> {
    let options = ClientOptions::parse(&settings.uri)
        .await
        .map_err(|e| StoreError::Initialization(e.to_string()))?;

    let client =
        Client::with_options(options).map_err(|e| StoreError::Initialization(e.to_string()))?;

    tracing::info!(
        target: "bookstore-db",
        database = %settings.name,
        "mongodb client created"
    );

    Ok(client)
}

/// Handle to the configured database.
pub fn database(client: &Client, settings: &DatabaseSettings) -> Database {
    client.database(&settings.name)
}

/// Create an ascending single-field index on each of `fields`.
///
/// Index creation is idempotent in MongoDB, so this is safe on every startup.
pub async fn ensure_indexes<T>(collection: &Collection<T>, fields: &[&str]) -> StoreResult<()>
where
    T: Send + Sync,
{
    for &field in fields {
        let name = collection
            .create_index(IndexModel::builder().keys(doc! { field: 1 }).build())
            .await?
            .index_name;

        tracing::info!(
            target: "bookstore-db",
            collection = collection.name(),
            index = %name,
            "index ensured"
        );
    }

    Ok(())
}
