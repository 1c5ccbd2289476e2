//! This file defines the mlcatalog binary entry point.

use mlcatalog::app;
use mlcatalog::app_state::AppState;
use mlcatalog::cli;
use mlcatalog::metrics;
use mlcatalog::provisioning;
use mlcatalog::resources;
use mlcatalog::server;
use mlcatalog::store::SledStore;
use mlcatalog::tracing;

use std::process::exit;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    ::tracing::debug!("{:?}", args);

    let store = match SledStore::from_args(&args) {
        Ok(store) => store,
        Err(err) => {
            ::tracing::error!("Failed to open document store: {}", err);
            exit(1)
        }
    };

    if args.teardown {
        match provisioning::teardown(&store, &resources::ALL) {
            Ok(dropped) => ::tracing::info!("Dropped {} collections", dropped),
            Err(err) => ::tracing::error!("Failed to drop collections: {}", err),
        }
    } else {
        metrics::register_metrics();
        let state = match AppState::new(&args, store.clone(), &resources::ALL) {
            Ok(state) => state,
            Err(err) => {
                ::tracing::error!("Failed to provision collections: {}", err);
                exit(1)
            }
        };
        let service = app::service(&state);
        server::serve(&args, service).await;
    }

    if let Err(err) = store.flush() {
        ::tracing::error!("Failed to flush document store: {}", err);
    }
    tracing::shutdown_tracing();
}
