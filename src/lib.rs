//! This crate provides a catalogue server for machine learning artefacts. It stores datasets,
//! models, experiments and notebooks as JSON documents and exposes each resource type through the
//! same REST interface: list, create, get, replace, update and delete.
//!
//! Every resource type is served by one generic handler. Documents carry a key (`_key`), a
//! fully qualified identifier (`_id`) and a revision (`_rev`). Document store failures are
//! classified in one place: missing documents become `404 Not Found`, duplicate keys and stale
//! revisions become `409 Conflict`, and anything else is passed through as a server error.
//!
//! The catalogue is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request and response data.
//! * [sled] is the embedded database holding the document collections.
//! * [validator] reports malformed documents.

pub mod app;
pub mod app_state;
pub mod cli;
pub mod document;
pub mod error;
pub mod metrics;
pub mod precondition;
pub mod provisioning;
pub mod resource;
pub mod resources;
pub mod server;
pub mod shape;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_json;
