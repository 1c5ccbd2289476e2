use crate::app_state::AppState;
use crate::cli::CommandLineArgs;
use crate::document::Document;
use crate::resource::ResourceHandler;
use crate::resources::{self, ResourceConfig};
use crate::store::SledStore;

use clap::Parser;
use serde_json::Value;
use std::sync::Arc;

/// Command line arguments selecting a throwaway database.
pub(crate) fn test_args() -> CommandLineArgs {
    CommandLineArgs::parse_from(["mlcatalog", "--temporary"])
}

/// Build a Document from a JSON object.
pub(crate) fn document(value: Value) -> Document {
    Document::try_from(value).unwrap()
}

/// Create a handler over a fresh temporary collection.
///
/// The store is returned alongside the handler and must outlive it.
pub(crate) fn test_handler(config: ResourceConfig) -> (SledStore, ResourceHandler) {
    let store = SledStore::temporary("").unwrap();
    let collection = store.create_collection(config.name).unwrap();
    let handler = ResourceHandler::new(config, Arc::new(collection), None);
    (store, handler)
}

/// Create application state for all resource types over a temporary database.
pub(crate) fn test_state() -> AppState {
    let args = test_args();
    let store = SledStore::from_args(&args).unwrap();
    AppState::new(&args, store, &resources::ALL).unwrap()
}
