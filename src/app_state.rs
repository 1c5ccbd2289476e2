use crate::cli::CommandLineArgs;
use crate::provisioning;
use crate::resource::{ResourceHandler, SharedResourceHandler};
use crate::resources::ResourceConfig;
use crate::store::{SledStore, StoreError};

use std::sync::Arc;

/// Shared application state used to build the request router.
pub struct AppState {
    /// Document store.
    pub store: SledStore,

    /// One handler per resource type, in mount order.
    pub handlers: Vec<SharedResourceHandler>,
}

impl AppState {
    /// Create and return an [AppState].
    ///
    /// Provisions a collection for each resource type and binds a handler to it.
    ///
    /// # Arguments
    ///
    /// * `args`: Command line arguments
    /// * `store`: Document store
    /// * `resources`: Resource types to serve
    pub fn new(
        args: &CommandLineArgs,
        store: SledStore,
        resources: &[ResourceConfig],
    ) -> Result<Self, StoreError> {
        provisioning::setup(&store, resources)?;
        Self::bind(args, store, resources)
    }

    /// Bind a handler to the existing collection of each resource type.
    ///
    /// Fails with [StoreError::CollectionNotFound] if a collection has not been provisioned.
    ///
    /// # Arguments
    ///
    /// * `args`: Command line arguments
    /// * `store`: Document store
    /// * `resources`: Resource types to serve
    pub fn bind(
        args: &CommandLineArgs,
        store: SledStore,
        resources: &[ResourceConfig],
    ) -> Result<Self, StoreError> {
        let handlers = resources
            .iter()
            .map(|config| {
                let collection = store.collection(config.name)?;
                Ok(Arc::new(ResourceHandler::new(
                    *config,
                    Arc::new(collection),
                    args.public_url.clone(),
                )))
            })
            .collect::<Result<_, StoreError>>()?;

        Ok(Self { store, handlers })
    }

    /// Return the handler for the named resource type.
    pub fn handler(&self, name: &str) -> Option<&SharedResourceHandler> {
        self.handlers.iter().find(|handler| handler.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::resources::{ALL, MODELS};
    use crate::test_utils::test_args;

    #[test]
    fn handlers_for_all_resources() {
        let args = test_args();
        let store = SledStore::from_args(&args).unwrap();
        let state = AppState::new(&args, store, &ALL).unwrap();
        assert_eq!(4, state.handlers.len());
        for resource in ALL {
            assert_eq!(resource.name, state.handler(resource.name).unwrap().name());
            assert!(state.store.has_collection(resource.name));
        }
        assert!(state.handler("unknown").is_none());
    }

    #[test]
    fn bind_unprovisioned() {
        let args = test_args();
        let store = SledStore::from_args(&args).unwrap();
        let error = AppState::bind(&args, store, &ALL).err().unwrap();
        assert_eq!(1203, error.code());
        assert!(matches!(error, StoreError::CollectionNotFound { name } if name == "datasets"));
    }

    #[test]
    fn bind_after_teardown() {
        let args = test_args();
        let store = SledStore::from_args(&args).unwrap();
        AppState::new(&args, store.clone(), &[MODELS]).unwrap();
        provisioning::teardown(&store, &[MODELS]).unwrap();
        assert!(AppState::bind(&args, store, &[MODELS]).is_err());
    }
}
