//! Error handling.

use crate::store::StoreError;

use axum::{
    extract::rejection::JsonRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};

/// Catalog server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The referenced document does not exist
    #[error("{0}")]
    NotFound(StoreError),

    /// Duplicate key on create, or concurrent modification on write
    #[error("{0}")]
    Conflict(StoreError),

    /// Any other document store failure
    #[error(transparent)]
    Store(StoreError),

    /// Error deserialising request data
    #[error("request data is not valid")]
    RequestDataJsonRejection(#[from] JsonRejection),

    /// Error validating request data (multiple errors)
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Malformed If-Match request header
    #[error("invalid If-Match header: {reason}")]
    InvalidIfMatch { reason: &'static str },

    /// A blocking document operation panicked or was cancelled
    #[error("document operation did not complete")]
    Task(#[from] tokio::task::JoinError),
}

impl CatalogError {
    /// Numeric store error code, for errors that originated in the document store.
    pub fn store_code(&self) -> Option<u32> {
        match self {
            Self::NotFound(error) | Self::Conflict(error) | Self::Store(error) => {
                Some(error.code())
            }
            _ => None,
        }
    }
}

impl From<StoreError> for CatalogError {
    /// Classify a document store error.
    ///
    /// Missing documents map to [CatalogError::NotFound], duplicate keys and write conflicts map to
    /// [CatalogError::Conflict]. Everything else is passed on unmapped as [CatalogError::Store].
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DocumentNotFound => Self::NotFound(error),
            StoreError::UniqueConstraintViolated { key: _ } | StoreError::Conflict => {
                Self::Conflict(error)
            }
            _ => Self::Store(error),
        }
    }
}

impl IntoResponse for CatalogError {
    /// Convert from a `CatalogError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Document store error code
    #[serde(skip_serializing_if = "Option::is_none")]
    error_num: Option<u32>,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new(error: &CatalogError) -> Self {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody {
            message,
            error_num: error.store_code(),
            caused_by,
        }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new(status: StatusCode, error: &CatalogError) -> Self {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request(error: &CatalogError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 404 not found ErrorResponse
    fn not_found(error: &CatalogError) -> Self {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Return a 409 conflict ErrorResponse
    fn conflict(error: &CatalogError) -> Self {
        Self::new(StatusCode::CONFLICT, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error(error: &CatalogError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<CatalogError> for ErrorResponse {
    /// Convert from a `CatalogError` into an `ErrorResponse`.
    fn from(error: CatalogError) -> Self {
        let response = match &error {
            // Bad request
            CatalogError::RequestDataJsonRejection(_)
            | CatalogError::RequestDataValidation(_)
            | CatalogError::InvalidIfMatch { reason: _ } => Self::bad_request(&error),

            // Not found
            CatalogError::NotFound(_) => Self::not_found(&error),

            // Conflict
            CatalogError::Conflict(_) => Self::conflict(&error),

            // Internal server error
            CatalogError::Store(_) | CatalogError::Task(_) => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hyper::HeaderMap;
    use regex::Regex;

    // Jump through the hoops to get the body as a string.
    async fn body_string(response: Response) -> String {
        String::from_utf8(
            hyper::body::to_bytes(response.into_body())
                .await
                .unwrap()
                .to_vec(),
        )
        .unwrap()
    }

    async fn test_catalog_error(
        error: CatalogError,
        status: StatusCode,
        message: &str,
        error_num: Option<u32>,
        caused_by: Option<Vec<&'static str>>,
    ) {
        let response = error.into_response();
        assert_eq!(status, response.status());
        let mut headers = HeaderMap::new();
        headers.insert(&header::CONTENT_TYPE, "application/json".parse().unwrap());
        assert_eq!(headers, *response.headers());
        let error_response: ErrorResponse =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(message.to_string(), error_response.error.message);
        assert_eq!(error_num, error_response.error.error_num);
        // Map Vec items from str to String
        let caused_by = caused_by.map(|cb| cb.iter().map(|s| s.to_string()).collect());
        assert_eq!(caused_by, error_response.error.caused_by);
    }

    #[test]
    fn classify_not_found() {
        let error = CatalogError::from(StoreError::DocumentNotFound);
        assert!(matches!(error, CatalogError::NotFound(_)));
    }

    #[test]
    fn classify_duplicate() {
        let error = CatalogError::from(StoreError::UniqueConstraintViolated {
            key: "k".to_string(),
        });
        assert!(matches!(error, CatalogError::Conflict(_)));
    }

    #[test]
    fn classify_conflict() {
        let error = CatalogError::from(StoreError::Conflict);
        assert!(matches!(error, CatalogError::Conflict(_)));
    }

    #[test]
    fn classify_unmapped() {
        let error = CatalogError::from(StoreError::IllegalKey);
        assert!(matches!(error, CatalogError::Store(StoreError::IllegalKey)));
        let error = CatalogError::from(StoreError::CollectionNotFound {
            name: "foo".to_string(),
        });
        assert!(matches!(
            error,
            CatalogError::Store(StoreError::CollectionNotFound { name: _ })
        ));
    }

    #[tokio::test]
    async fn not_found() {
        let error = CatalogError::from(StoreError::DocumentNotFound);
        let message = "document not found";
        test_catalog_error(error, StatusCode::NOT_FOUND, message, Some(1202), None).await;
    }

    #[tokio::test]
    async fn duplicate_key() {
        let error = CatalogError::from(StoreError::UniqueConstraintViolated {
            key: "abc".to_string(),
        });
        let message = "unique constraint violated - in index primary of type primary over '_key'; conflicting key: abc";
        test_catalog_error(error, StatusCode::CONFLICT, message, Some(1210), None).await;
    }

    #[tokio::test]
    async fn write_conflict() {
        let error = CatalogError::from(StoreError::Conflict);
        let message = "conflict, _rev values do not match";
        test_catalog_error(error, StatusCode::CONFLICT, message, Some(1200), None).await;
    }

    #[tokio::test]
    async fn collection_not_found() {
        let error = CatalogError::from(StoreError::CollectionNotFound {
            name: "models".to_string(),
        });
        let message = "collection or view not found: models";
        test_catalog_error(
            error,
            StatusCode::INTERNAL_SERVER_ERROR,
            message,
            Some(1203),
            None,
        )
        .await;
    }

    #[tokio::test]
    async fn engine_error() {
        let error = CatalogError::from(StoreError::Engine(sled::Error::Unsupported(
            "fake engine error".to_string(),
        )));
        let response = error.into_response();
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
        let error_response: ErrorResponse =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!("storage engine error", error_response.error.message);
        assert_eq!(Some(2), error_response.error.error_num);
        let caused_by = error_response.error.caused_by.unwrap();
        let re = Regex::new(r".*fake engine error.*").unwrap();
        assert!(re.is_match(&caused_by[0]), "caused_by: {caused_by:?}");
    }

    #[tokio::test]
    async fn request_data_validation() {
        let mut validation_errors = validator::ValidationErrors::new();
        let validation_error = validator::ValidationError::new("foo");
        validation_errors.add("bar", validation_error);
        let error = CatalogError::RequestDataValidation(validation_errors);
        let message = "request data is not valid";
        let caused_by = Some(vec!["bar: Validation error: foo [{}]"]);
        test_catalog_error(error, StatusCode::BAD_REQUEST, message, None, caused_by).await;
    }

    #[tokio::test]
    async fn task_failed() {
        let join_error = tokio::task::spawn_blocking(|| panic!("store operation panicked"))
            .await
            .unwrap_err();
        let error = CatalogError::from(join_error);
        let response = error.into_response();
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
        let error_response: ErrorResponse =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(
            "document operation did not complete",
            error_response.error.message
        );
        assert_eq!(None, error_response.error.error_num);
    }

    #[tokio::test]
    async fn invalid_if_match() {
        let error = CatalogError::InvalidIfMatch {
            reason: "entity tag must be quoted",
        };
        let message = "invalid If-Match header: entity tag must be quoted";
        test_catalog_error(error, StatusCode::BAD_REQUEST, message, None, None).await;
    }
}
