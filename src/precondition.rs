//! Axum extractor for the `If-Match` request header
//!
//! Writes may carry the revision the client last saw. The revision is passed to the store, which
//! refuses the write if the document has moved on since.

use crate::error::CatalogError;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// Expected revision taken from an `If-Match` header.
///
/// `None` if the header is absent or is the `*` wildcard.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IfMatch(pub Option<String>);

impl IfMatch {
    pub fn revision(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for IfMatch
where
    S: Send + Sync,
{
    type Rejection = CatalogError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.headers.get(header::IF_MATCH) {
            None => Ok(IfMatch(None)),
            Some(value) => {
                let value = value.to_str().map_err(|_| CatalogError::InvalidIfMatch {
                    reason: "header is not visible ASCII",
                })?;
                parse_if_match(value).map(IfMatch)
            }
        }
    }
}

/// Parse an `If-Match` header value holding a single entity tag.
///
/// Weak tags (`W/"..."`) are accepted and compared as if strong.
pub fn parse_if_match(value: &str) -> Result<Option<String>, CatalogError> {
    let value = value.trim();
    if value == "*" {
        return Ok(None);
    }
    let tag = value.strip_prefix("W/").unwrap_or(value);
    let revision = tag
        .strip_prefix('"')
        .and_then(|tag| tag.strip_suffix('"'))
        .ok_or(CatalogError::InvalidIfMatch {
            reason: "entity tag must be quoted",
        })?;
    if revision.contains('"') {
        return Err(CatalogError::InvalidIfMatch {
            reason: "only a single entity tag is supported",
        });
    }
    if revision.is_empty() {
        return Err(CatalogError::InvalidIfMatch {
            reason: "entity tag is empty",
        });
    }
    Ok(Some(revision.to_string()))
}

/// Format a revision as a strong entity tag for the `ETag` response header.
pub fn entity_tag(revision: &str) -> String {
    format!("\"{}\"", revision)
}
