//! Generic CRUD handler for one resource type
//!
//! A [ResourceHandler] binds a [ResourceConfig] to a document collection. Each operation performs
//! a single call into the store and converts the outcome with the shared classification in
//! [CatalogError]'s `From<StoreError>` implementation, so all resource types report errors the
//! same way.

use crate::document::Document;
use crate::error::CatalogError;
use crate::metrics;
use crate::resources::ResourceConfig;
use crate::store::DocumentCollection;

use std::sync::Arc;
use strum_macros::Display;
use url::Url;

/// Resource operations, used to label metrics.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    List,
    Create,
    Get,
    Replace,
    Update,
    Delete,
}

/// Result of a successful create.
#[derive(Debug, PartialEq)]
pub struct Created {
    /// The stored document, including its system attributes
    pub document: Document,
    /// Location of the document's detail resource
    pub location: String,
}

/// Handler for one resource type.
#[derive(Debug)]
pub struct ResourceHandler {
    /// Resource type description.
    config: ResourceConfig,
    /// Collection holding the resource's documents.
    collection: Arc<dyn DocumentCollection>,
    /// Base for absolute locations. Locations are absolute paths if unset.
    public_url: Option<Url>,
}

/// ResourceHandler wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedResourceHandler = Arc<ResourceHandler>;

impl ResourceHandler {
    /// Create and return a [ResourceHandler].
    ///
    /// # Arguments
    ///
    /// * `config`: Resource type description
    /// * `collection`: Collection holding the resource's documents
    /// * `public_url`: Optional base URL used to make `Location` values absolute
    pub fn new(
        config: ResourceConfig,
        collection: Arc<dyn DocumentCollection>,
        public_url: Option<Url>,
    ) -> Self {
        Self {
            config,
            collection,
            public_url,
        }
    }

    /// Name of the resource type.
    pub fn name(&self) -> &'static str {
        self.config.name
    }

    /// Location of the detail resource for `key`.
    pub fn location(&self, key: &str) -> String {
        match &self.public_url {
            Some(base) => {
                let mut url = base.clone();
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().extend([self.config.name, key]);
                }
                url.to_string()
            }
            None => {
                let mut url = Url::parse("http://localhost/").expect("static URL is valid");
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.clear().extend([self.config.name, key]);
                }
                url.path().to_string()
            }
        }
    }

    /// Return all documents.
    #[tracing::instrument(level = "DEBUG", skip(self), fields(resource = self.config.name))]
    pub fn list(&self) -> Result<Vec<Document>, CatalogError> {
        let result = self.collection.all().map_err(CatalogError::from);
        self.observe(Operation::List, result)
    }

    /// Create a new document.
    ///
    /// A `_key` in the document is honoured, otherwise the store generates one.
    #[tracing::instrument(level = "DEBUG", skip(self, document), fields(resource = self.config.name))]
    pub fn create(&self, document: Document) -> Result<Created, CatalogError> {
        let result = self.try_create(document);
        if let Ok(created) = &result {
            tracing::info!(
                "Created {} {}",
                self.config.singular,
                created.document.key().unwrap_or_default()
            );
        }
        self.observe(Operation::Create, result)
    }

    fn try_create(&self, document: Document) -> Result<Created, CatalogError> {
        self.config.shape.validate_full(&document)?;
        let meta = self.collection.save(document.clone())?;
        let mut document = document.without_system_attributes();
        document.assign(&meta);
        Ok(Created {
            location: self.location(&meta.key),
            document,
        })
    }

    /// Return the document with the given key.
    #[tracing::instrument(level = "DEBUG", skip(self), fields(resource = self.config.name))]
    pub fn get(&self, key: &str) -> Result<Document, CatalogError> {
        let result = self.collection.document(key).map_err(CatalogError::from);
        self.observe(Operation::Get, result)
    }

    /// Replace the document with the given key.
    ///
    /// # Arguments
    ///
    /// * `key`: Key of the document to replace
    /// * `document`: The new document
    /// * `expected_rev`: Optional revision the stored document must currently have
    #[tracing::instrument(level = "DEBUG", skip(self, document), fields(resource = self.config.name))]
    pub fn replace(
        &self,
        key: &str,
        document: Document,
        expected_rev: Option<&str>,
    ) -> Result<Document, CatalogError> {
        let result = self.try_replace(key, document, expected_rev);
        self.observe(Operation::Replace, result)
    }

    fn try_replace(
        &self,
        key: &str,
        document: Document,
        expected_rev: Option<&str>,
    ) -> Result<Document, CatalogError> {
        self.config.shape.validate_full(&document)?;
        let meta = self
            .collection
            .replace(key, document.clone(), expected_rev)?;
        let mut document = document.without_system_attributes();
        document.assign(&meta);
        Ok(document)
    }

    /// Merge `patch` into the document with the given key.
    ///
    /// Returns the complete document after the merge.
    ///
    /// # Arguments
    ///
    /// * `key`: Key of the document to update
    /// * `patch`: Fields to overwrite
    /// * `expected_rev`: Optional revision the stored document must currently have
    #[tracing::instrument(level = "DEBUG", skip(self, patch), fields(resource = self.config.name))]
    pub fn update(
        &self,
        key: &str,
        patch: Document,
        expected_rev: Option<&str>,
    ) -> Result<Document, CatalogError> {
        let result = self
            .config
            .shape
            .validate_partial(&patch)
            .map_err(CatalogError::from)
            .and_then(|()| {
                self.collection
                    .update(key, patch, expected_rev)
                    .map_err(CatalogError::from)
            });
        self.observe(Operation::Update, result)
    }

    /// Delete the document with the given key.
    ///
    /// # Arguments
    ///
    /// * `key`: Key of the document to delete
    /// * `expected_rev`: Optional revision the stored document must currently have
    #[tracing::instrument(level = "DEBUG", skip(self), fields(resource = self.config.name))]
    pub fn delete(&self, key: &str, expected_rev: Option<&str>) -> Result<(), CatalogError> {
        let result = self
            .collection
            .remove(key, expected_rev)
            .map(|_| ())
            .map_err(CatalogError::from);
        if result.is_ok() {
            tracing::info!("Deleted {} {}", self.config.singular, key);
        }
        self.observe(Operation::Delete, result)
    }

    /// Record the outcome of an operation.
    fn observe<T>(
        &self,
        operation: Operation,
        result: Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        let outcome = match &result {
            Ok(_) => "ok",
            Err(CatalogError::NotFound(_)) => "not_found",
            Err(CatalogError::Conflict(_)) => "conflict",
            Err(CatalogError::Store(_)) => "error",
            Err(_) => "invalid",
        };
        metrics::record_document_operation(self.config.name, &operation.to_string(), outcome);
        result
    }
}
