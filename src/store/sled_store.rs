//! Document store backed by the [sled] embedded database.
//!
//! Each collection is a sled tree holding JSON encoded documents indexed by key. Writes use
//! compare-and-swap against the value that was read, so concurrent writers to the same document
//! are detected rather than silently overwriting each other.

use crate::cli::CommandLineArgs;
use crate::document::{self, Document, DocumentMeta};
use crate::store::{DocumentCollection, StoreError};

use expanduser::expanduser;
use sled::{Db, IVec, Tree};
use std::fmt;
use std::path::Path;

/// A sled database holding document collections.
#[derive(Clone)]
pub struct SledStore {
    /// Underlying database.
    db: Db,
    /// Prefix applied to collection names.
    prefix: String,
}

impl fmt::Debug for SledStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SledStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl SledStore {
    /// Open the store described by the command line arguments.
    ///
    /// # Arguments
    ///
    /// * `args`: Command line arguments
    pub fn from_args(args: &CommandLineArgs) -> Result<Self, StoreError> {
        if args.temporary {
            return Self::temporary(&args.collection_prefix);
        }
        let path = expanduser(&args.data_dir)
            .expect("Failed to expand ~ to user name. Please provide an absolute path instead.");
        Self::open(&path, args.cache_capacity, &args.collection_prefix)
    }

    /// Open or create a persistent store.
    ///
    /// # Arguments
    ///
    /// * `path`: Database directory
    /// * `cache_capacity`: Size in bytes of sled's page cache
    /// * `prefix`: Prefix applied to collection names
    pub fn open(path: &Path, cache_capacity: u64, prefix: &str) -> Result<Self, StoreError> {
        tracing::info!("Opening document store at {}", path.display());
        let db = sled::Config::new()
            .path(path)
            .cache_capacity(cache_capacity)
            .open()?;
        Ok(Self {
            db,
            prefix: prefix.to_string(),
        })
    }

    /// Create a store that is deleted when dropped.
    pub fn temporary(prefix: &str) -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            db,
            prefix: prefix.to_string(),
        })
    }

    /// Qualified name of a collection.
    pub fn qualified_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Whether the named collection has been created.
    pub fn has_collection(&self, name: &str) -> bool {
        let qualified = self.qualified_name(name);
        self.db
            .tree_names()
            .iter()
            .any(|tree| &tree[..] == qualified.as_bytes())
    }

    /// Create a collection if it does not exist and return it.
    pub fn create_collection(&self, name: &str) -> Result<SledCollection, StoreError> {
        let qualified = self.qualified_name(name);
        if !self.has_collection(name) {
            tracing::info!("Creating collection {}", qualified);
        }
        let tree = self.db.open_tree(&qualified)?;
        Ok(SledCollection {
            name: qualified,
            tree,
            db: self.db.clone(),
        })
    }

    /// Return an existing collection.
    pub fn collection(&self, name: &str) -> Result<SledCollection, StoreError> {
        if !self.has_collection(name) {
            return Err(StoreError::CollectionNotFound {
                name: self.qualified_name(name),
            });
        }
        let qualified = self.qualified_name(name);
        let tree = self.db.open_tree(&qualified)?;
        Ok(SledCollection {
            name: qualified,
            tree,
            db: self.db.clone(),
        })
    }

    /// Drop a collection and all of its documents.
    ///
    /// Returns whether the collection existed.
    pub fn drop_collection(&self, name: &str) -> Result<bool, StoreError> {
        let qualified = self.qualified_name(name);
        let dropped = self.db.drop_tree(&qualified)?;
        if dropped {
            tracing::info!("Dropped collection {}", qualified);
        }
        Ok(dropped)
    }

    /// Flush dirty pages to disk.
    pub fn flush(&self) -> Result<usize, StoreError> {
        Ok(self.db.flush()?)
    }
}

/// A collection of documents stored in a sled tree.
#[derive(Clone)]
pub struct SledCollection {
    /// Qualified collection name.
    name: String,
    /// Tree holding the documents.
    tree: Tree,
    /// Owning database, used for key and revision generation.
    db: Db,
}

impl fmt::Debug for SledCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SledCollection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SledCollection {
    /// Number of documents in the collection.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Generate a key for a document that was saved without one.
    fn generate_key(&self) -> Result<String, StoreError> {
        Ok(self.db.generate_id()?.to_string())
    }

    /// Generate a new revision token.
    fn generate_revision(&self) -> Result<String, StoreError> {
        Ok(format!("{:x}", self.db.generate_id()?))
    }

    /// Read a document, returning the raw stored value alongside the decoded document.
    fn read(&self, key: &str) -> Result<(IVec, Document), StoreError> {
        // Illegal keys can never have been stored.
        if !document::is_valid_key(key) {
            return Err(StoreError::DocumentNotFound);
        }
        let raw = self.tree.get(key)?.ok_or(StoreError::DocumentNotFound)?;
        let document = serde_json::from_slice(&raw)?;
        Ok((raw, document))
    }

    /// Atomically overwrite the raw value `old` with `new`.
    ///
    /// Fails with [StoreError::Conflict] if the stored value is no longer `old`.
    fn swap(&self, key: &str, old: &IVec, new: Option<&Document>) -> Result<(), StoreError> {
        let new = new.map(serde_json::to_vec).transpose()?;
        match self.tree.compare_and_swap(key, Some(old), new)? {
            Ok(()) => Ok(()),
            Err(_) => {
                tracing::debug!("Concurrent modification of {}/{}", self.name, key);
                Err(StoreError::Conflict)
            }
        }
    }
}

/// Fail with [StoreError::Conflict] if `current` does not have the expected revision.
fn check_revision(current: &Document, expected_rev: Option<&str>) -> Result<(), StoreError> {
    match expected_rev {
        Some(expected) if current.revision() != Some(expected) => Err(StoreError::Conflict),
        _ => Ok(()),
    }
}

impl DocumentCollection for SledCollection {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(level = "DEBUG", skip(self), fields(collection = %self.name))]
    fn all(&self) -> Result<Vec<Document>, StoreError> {
        self.tree
            .iter()
            .values()
            .map(|raw| -> Result<Document, StoreError> { Ok(serde_json::from_slice(&raw?)?) })
            .collect()
    }

    #[tracing::instrument(level = "DEBUG", skip(self, document), fields(collection = %self.name))]
    fn save(&self, document: Document) -> Result<DocumentMeta, StoreError> {
        let supplied_key = match (document.key(), document.get(document::KEY)) {
            (Some(key), _) if document::is_valid_key(key) => Some(key.to_string()),
            (None, None) => None,
            _ => return Err(StoreError::IllegalKey),
        };
        let document = document.without_system_attributes();
        loop {
            let key = match &supplied_key {
                Some(key) => key.clone(),
                None => self.generate_key()?,
            };
            let meta = DocumentMeta::new(&self.name, &key, &self.generate_revision()?);
            let mut stored = document.clone();
            stored.assign(&meta);
            let raw = serde_json::to_vec(&stored)?;
            match self.tree.compare_and_swap(&key, None::<&[u8]>, Some(raw))? {
                Ok(()) => return Ok(meta),
                // A caller chose this key earlier. Generated keys are never reused, so retry.
                Err(_) if supplied_key.is_none() => {
                    tracing::debug!("Generated key {}/{} is taken", self.name, key);
                }
                Err(_) => return Err(StoreError::UniqueConstraintViolated { key }),
            }
        }
    }

    #[tracing::instrument(level = "DEBUG", skip(self), fields(collection = %self.name))]
    fn document(&self, key: &str) -> Result<Document, StoreError> {
        let (_, document) = self.read(key)?;
        Ok(document)
    }

    #[tracing::instrument(level = "DEBUG", skip(self, document), fields(collection = %self.name))]
    fn replace(
        &self,
        key: &str,
        document: Document,
        expected_rev: Option<&str>,
    ) -> Result<DocumentMeta, StoreError> {
        let (raw, current) = self.read(key)?;
        check_revision(&current, expected_rev)?;
        let meta = DocumentMeta::new(&self.name, key, &self.generate_revision()?);
        let mut stored = document.without_system_attributes();
        stored.assign(&meta);
        self.swap(key, &raw, Some(&stored))?;
        Ok(meta)
    }

    #[tracing::instrument(level = "DEBUG", skip(self, patch), fields(collection = %self.name))]
    fn update(
        &self,
        key: &str,
        patch: Document,
        expected_rev: Option<&str>,
    ) -> Result<Document, StoreError> {
        let (raw, mut current) = self.read(key)?;
        check_revision(&current, expected_rev)?;
        let meta = DocumentMeta::new(&self.name, key, &self.generate_revision()?);
        current.merge(patch);
        current.assign(&meta);
        self.swap(key, &raw, Some(&current))?;
        Ok(current)
    }

    #[tracing::instrument(level = "DEBUG", skip(self), fields(collection = %self.name))]
    fn remove(&self, key: &str, expected_rev: Option<&str>) -> Result<DocumentMeta, StoreError> {
        let (raw, current) = self.read(key)?;
        check_revision(&current, expected_rev)?;
        self.swap(key, &raw, None)?;
        Ok(DocumentMeta::new(
            &self.name,
            key,
            current.revision().unwrap_or_default(),
        ))
    }
}
