//! Creation and removal of the catalog's collections

use crate::resources::ResourceConfig;
use crate::store::{SledStore, StoreError};

/// Create the collection for each resource type, if it does not already exist.
///
/// # Arguments
///
/// * `store`: Document store
/// * `resources`: Resource types to provision
pub fn setup(store: &SledStore, resources: &[ResourceConfig]) -> Result<(), StoreError> {
    for resource in resources {
        store.create_collection(resource.name)?;
    }
    Ok(())
}

/// Drop the collection of each resource type, along with all of its documents.
///
/// Returns the number of collections that existed.
///
/// # Arguments
///
/// * `store`: Document store
/// * `resources`: Resource types to remove
pub fn teardown(store: &SledStore, resources: &[ResourceConfig]) -> Result<usize, StoreError> {
    let mut dropped = 0;
    for resource in resources {
        if store.drop_collection(resource.name)? {
            dropped += 1;
        }
    }
    Ok(dropped)
}
