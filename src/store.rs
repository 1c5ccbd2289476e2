//! Document store abstraction
//!
//! The store is the only component that knows how documents are persisted. It detects duplicate
//! keys and concurrent writes itself and reports them through [StoreError], leaving
//! classification of those errors to the API layer.

pub mod sled_store;

pub use crate::store::sled_store::{SledCollection, SledStore};

use crate::document::{Document, DocumentMeta};

use thiserror::Error;

/// Numeric error codes reported alongside store errors.
pub mod codes {
    /// Generic storage engine failure
    pub const ENGINE: u32 = 2;
    /// Write-write conflict or revision mismatch
    pub const CONFLICT: u32 = 1200;
    /// No document with the requested key
    pub const DOCUMENT_NOT_FOUND: u32 = 1202;
    /// The collection has not been provisioned
    pub const COLLECTION_NOT_FOUND: u32 = 1203;
    /// A document with the same key already exists
    pub const UNIQUE_CONSTRAINT_VIOLATED: u32 = 1210;
    /// The document key is malformed
    pub const ILLEGAL_KEY: u32 = 1221;
    /// The document could not be encoded or decoded
    pub const INVALID_DOCUMENT: u32 = 1227;
}

/// Document store error type
///
/// Each variant carries a stable numeric code, see [StoreError::code].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document was modified since it was read, or its revision does not match the expected
    /// revision
    #[error("conflict, _rev values do not match")]
    Conflict,

    /// No document exists with the requested key
    #[error("document not found")]
    DocumentNotFound,

    /// The collection does not exist
    #[error("collection or view not found: {name}")]
    CollectionNotFound { name: String },

    /// A document with the same key already exists
    #[error("unique constraint violated - in index primary of type primary over '_key'; conflicting key: {key}")]
    UniqueConstraintViolated { key: String },

    /// The document key is malformed
    #[error("illegal document key")]
    IllegalKey,

    /// The document could not be encoded or decoded
    #[error("invalid document")]
    Serialization(#[from] serde_json::Error),

    /// Error in the underlying storage engine
    #[error("storage engine error")]
    Engine(#[from] sled::Error),
}

impl StoreError {
    /// The numeric error code for this error.
    pub fn code(&self) -> u32 {
        match self {
            Self::Conflict => codes::CONFLICT,
            Self::DocumentNotFound => codes::DOCUMENT_NOT_FOUND,
            Self::CollectionNotFound { name: _ } => codes::COLLECTION_NOT_FOUND,
            Self::UniqueConstraintViolated { key: _ } => codes::UNIQUE_CONSTRAINT_VIOLATED,
            Self::IllegalKey => codes::ILLEGAL_KEY,
            Self::Serialization(_) => codes::INVALID_DOCUMENT,
            Self::Engine(_) => codes::ENGINE,
        }
    }
}

/// Operations on a single collection of documents.
///
/// This forms the contract between the resource handlers and the store. Every method is a single
/// atomic call; implementations must detect duplicate keys and concurrent modification themselves.
///
/// Writes accept an optional `expected_rev`. When given, the write fails with
/// [StoreError::Conflict] unless the stored document's `_rev` is equal to it.
pub trait DocumentCollection: std::fmt::Debug + Send + Sync {
    /// Name of the collection.
    fn name(&self) -> &str;

    /// All documents in the collection, in no particular order.
    fn all(&self) -> Result<Vec<Document>, StoreError>;

    /// Insert a new document.
    ///
    /// The document's `_key` is used if present, otherwise one is generated.
    ///
    /// # Arguments
    ///
    /// * `document`: Document to insert
    fn save(&self, document: Document) -> Result<DocumentMeta, StoreError>;

    /// Fetch the document with the given key.
    fn document(&self, key: &str) -> Result<Document, StoreError>;

    /// Replace the document with the given key.
    ///
    /// # Arguments
    ///
    /// * `key`: Key of the document to replace
    /// * `document`: New contents. System attributes in the body are ignored.
    /// * `expected_rev`: Optional revision the stored document must have
    fn replace(
        &self,
        key: &str,
        document: Document,
        expected_rev: Option<&str>,
    ) -> Result<DocumentMeta, StoreError>;

    /// Merge `patch` into the document with the given key.
    ///
    /// Returns the complete document after the merge.
    ///
    /// # Arguments
    ///
    /// * `key`: Key of the document to update
    /// * `patch`: Fields to overwrite
    /// * `expected_rev`: Optional revision the stored document must have
    fn update(
        &self,
        key: &str,
        patch: Document,
        expected_rev: Option<&str>,
    ) -> Result<Document, StoreError>;

    /// Remove the document with the given key.
    ///
    /// # Arguments
    ///
    /// * `key`: Key of the document to remove
    /// * `expected_rev`: Optional revision the stored document must have
    fn remove(&self, key: &str, expected_rev: Option<&str>) -> Result<DocumentMeta, StoreError>;
}
