//! Request router
//!
//! Each resource type is mounted at `/<name>` with the same set of routes, all backed by that
//! type's [ResourceHandler](crate::resource::ResourceHandler).

use crate::app_state::AppState;
use crate::document::Document;
use crate::error::CatalogError;
use crate::metrics;
use crate::precondition::{self, IfMatch};
use crate::resource::SharedResourceHandler;
use crate::validated_json::ValidatedJson;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;
use tower_http::validate_request::ValidateRequestHeaderLayer;

/// Service that trims trailing slashes from request paths before routing.
pub type Service = NormalizePath<Router>;

/// Returns a [Service] serving every resource type in `state`.
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn service(state: &AppState) -> Service {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// Returns a [axum::Router] with a nested router per resource type.
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn router(state: &AppState) -> Router {
    let mut router = Router::new().route("/metrics", get(metrics::metrics_handler));
    for handler in &state.handlers {
        router = router.nest(
            &format!("/{}", handler.name()),
            resource_router(handler.clone()),
        );
    }
    router.layer(
        TraceLayer::new_for_http()
            .on_request(metrics::request_counter)
            .on_response(metrics::record_response_metrics),
    )
}

fn resource_router(handler: SharedResourceHandler) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/:key",
            get(read).put(replace).patch(update).delete(remove),
        )
        .layer(ValidateRequestHeaderLayer::custom(
            // Reject clients that will not accept a JSON response.
            |request: &mut Request<Body>| {
                if accepts_json(request.headers()) {
                    Ok(())
                } else {
                    Err(StatusCode::NOT_ACCEPTABLE.into_response())
                }
            },
        ))
        .with_state(handler)
}

/// Whether the `Accept` headers, if any, admit `application/json`.
fn accepts_json(headers: &HeaderMap) -> bool {
    let mut values = headers.get_all(header::ACCEPT).iter().peekable();
    if values.peek().is_none() {
        return true;
    }
    values
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|range| {
            let media_type = range.split(';').next().unwrap_or_default().trim();
            matches!(
                media_type.to_ascii_lowercase().as_str(),
                "*/*" | "application/*" | "application/json"
            )
        })
}

/// JSON response for a single document, tagged with its revision.
fn document_response(status: StatusCode, document: Document) -> Response {
    let etag = document.revision().map(precondition::entity_tag);
    let mut response = (status, Json(document)).into_response();
    if let Some(etag) = etag.and_then(|etag| HeaderValue::from_str(&etag).ok()) {
        response.headers_mut().insert(header::ETAG, etag);
    }
    response
}

/// Run a document operation on the blocking thread pool, keeping store I/O off the runtime.
async fn blocking<T, F>(operation: F) -> Result<T, CatalogError>
where
    F: FnOnce() -> Result<T, CatalogError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation).await?
}

async fn list(
    State(handler): State<SharedResourceHandler>,
) -> Result<Json<Vec<Document>>, CatalogError> {
    let documents = blocking(move || handler.list()).await?;
    Ok(Json(documents))
}

async fn create(
    State(handler): State<SharedResourceHandler>,
    ValidatedJson(document): ValidatedJson<Document>,
) -> Result<Response, CatalogError> {
    let created = blocking(move || handler.create(document)).await?;
    let location = HeaderValue::from_str(&created.location);
    let mut response = document_response(StatusCode::CREATED, created.document);
    if let Ok(location) = location {
        response.headers_mut().insert(header::LOCATION, location);
    }
    Ok(response)
}

async fn read(
    State(handler): State<SharedResourceHandler>,
    Path(key): Path<String>,
) -> Result<Response, CatalogError> {
    let document = blocking(move || handler.get(&key)).await?;
    Ok(document_response(StatusCode::OK, document))
}

// System attributes in replace and update bodies are ignored, so `_key` is not validated here.
async fn replace(
    State(handler): State<SharedResourceHandler>,
    Path(key): Path<String>,
    if_match: IfMatch,
    body: Result<Json<Document>, JsonRejection>,
) -> Result<Response, CatalogError> {
    let Json(document) = body?;
    let document =
        blocking(move || handler.replace(&key, document, if_match.revision())).await?;
    Ok(document_response(StatusCode::OK, document))
}

async fn update(
    State(handler): State<SharedResourceHandler>,
    Path(key): Path<String>,
    if_match: IfMatch,
    body: Result<Json<Document>, JsonRejection>,
) -> Result<Response, CatalogError> {
    let Json(patch) = body?;
    let document = blocking(move || handler.update(&key, patch, if_match.revision())).await?;
    Ok(document_response(StatusCode::OK, document))
}

async fn remove(
    State(handler): State<SharedResourceHandler>,
    Path(key): Path<String>,
    if_match: IfMatch,
) -> Result<StatusCode, CatalogError> {
    blocking(move || handler.delete(&key, if_match.revision())).await?;
    Ok(StatusCode::NO_CONTENT)
}
