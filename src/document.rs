//! Documents and their system attributes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

/// Name of the key attribute.
pub const KEY: &str = "_key";
/// Name of the document handle attribute (`<collection>/<key>`).
pub const ID: &str = "_id";
/// Name of the revision attribute.
pub const REV: &str = "_rev";

/// Maximum length in bytes of a document key.
pub const MAX_KEY_LENGTH: usize = 254;

/// Punctuation permitted in document keys in addition to ASCII letters and digits.
const KEY_PUNCTUATION: &str = "_-:.@()+,=;$!*'%";

/// Returns whether `key` is a legal document key.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || KEY_PUNCTUATION.contains(c))
}

/// Returns whether `field` is one of the store-managed system attributes.
pub fn is_system_attribute(field: &str) -> bool {
    matches!(field, KEY | ID | REV)
}

/// A single resource record.
///
/// Documents are opaque JSON objects. Apart from the `_key`, `_id` and `_rev` system attributes
/// the contents are passed through unchanged.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Return a new, empty Document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The document key, if it has one.
    pub fn key(&self) -> Option<&str> {
        self.0.get(KEY).and_then(Value::as_str)
    }

    /// The document revision, if it has one.
    pub fn revision(&self) -> Option<&str> {
        self.0.get(REV).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Copy the system attributes from `meta` into the document.
    pub fn assign(&mut self, meta: &DocumentMeta) {
        self.0.insert(ID.into(), Value::String(meta.id.clone()));
        self.0.insert(KEY.into(), Value::String(meta.key.clone()));
        self.0.insert(REV.into(), Value::String(meta.rev.clone()));
    }

    /// Shallow merge of `patch` into the document.
    ///
    /// Top level fields of `patch` overwrite those of the document; nested objects are replaced
    /// rather than merged. System attributes in `patch` are ignored.
    pub fn merge(&mut self, patch: Document) {
        for (field, value) in patch.0 {
            if !is_system_attribute(&field) {
                self.0.insert(field, value);
            }
        }
    }

    /// Remove the system attributes, returning the user-defined fields only.
    pub fn without_system_attributes(mut self) -> Self {
        self.0.retain(|field, _| !is_system_attribute(field));
        self
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = Value;

    /// Convert a JSON value into a Document, returning the value unchanged if it is not an object.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl Validate for Document {
    /// Validate a document received from a client.
    ///
    /// Only the `_key` attribute is checked here. Resource specific fields are checked against
    /// the resource's [crate::shape::DocumentShape].
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match self.0.get(KEY) {
            None => (),
            Some(Value::String(key)) if is_valid_key(key) => (),
            Some(Value::String(_)) => {
                let mut error = ValidationError::new("illegal_key");
                error.message = Some(Cow::from(
                    "_key must be 1-254 characters of letters, digits or _-:.@()+,=;$!*'%",
                ));
                errors.add(KEY, error);
            }
            Some(_) => {
                let mut error = ValidationError::new("type");
                error.message = Some(Cow::from("_key must be a string"));
                errors.add(KEY, error);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// System attributes of a stored document, as returned by store writes.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DocumentMeta {
    /// Document handle
    #[serde(rename = "_id")]
    pub id: String,
    /// Document key
    #[serde(rename = "_key")]
    pub key: String,
    /// Document revision
    #[serde(rename = "_rev")]
    pub rev: String,
}

impl DocumentMeta {
    pub fn new(collection: &str, key: &str, rev: &str) -> Self {
        Self {
            id: format!("{}/{}", collection, key),
            key: key.to_string(),
            rev: rev.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use serde_test::{assert_ser_tokens, Token};

    fn document(value: Value) -> Document {
        Document::try_from(value).unwrap()
    }

    #[test]
    fn valid_keys() {
        assert!(is_valid_key("abc"));
        assert!(is_valid_key("123"));
        assert!(is_valid_key("a_b-c:d.e@f(g)h+i,j=k;l$m!n*o'p%q"));
        assert!(is_valid_key(&"x".repeat(MAX_KEY_LENGTH)));
    }

    #[test]
    fn invalid_keys() {
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("a b"));
        assert!(!is_valid_key("a/b"));
        assert!(!is_valid_key("ümlaut"));
        assert!(!is_valid_key(&"x".repeat(MAX_KEY_LENGTH + 1)));
    }

    #[test]
    fn system_attributes() {
        let doc = document(json!({"_key": "k", "_rev": "r", "name": "n"}));
        assert_eq!(Some("k"), doc.key());
        assert_eq!(Some("r"), doc.revision());
        let doc = doc.without_system_attributes();
        assert_eq!(document(json!({"name": "n"})), doc);
        assert_eq!(None, doc.key());
    }

    #[test]
    fn non_string_key() {
        let doc = document(json!({"_key": 42}));
        assert_eq!(None, doc.key());
    }

    #[test]
    fn try_from_non_object() {
        assert_eq!(Err(json!([1, 2])), Document::try_from(json!([1, 2])));
    }

    #[test]
    fn assign_meta() {
        let mut doc = document(json!({"name": "m1"}));
        doc.assign(&DocumentMeta::new("models", "123", "abc"));
        assert_eq!(
            document(json!({"name": "m1", "_id": "models/123", "_key": "123", "_rev": "abc"})),
            doc
        );
    }

    #[test]
    fn merge_is_shallow() {
        let mut doc = document(json!({
            "_key": "k",
            "name": "n",
            "nested": {"a": 1, "b": 2},
            "keep": true
        }));
        doc.merge(document(json!({
            "_key": "other",
            "_rev": "other",
            "name": "m",
            "nested": {"a": 3},
            "new": null
        })));
        assert_eq!(
            document(json!({
                "_key": "k",
                "name": "m",
                "nested": {"a": 3},
                "keep": true,
                "new": null
            })),
            doc
        );
    }

    #[test]
    fn validate_ok() {
        assert!(document(json!({"name": "n"})).validate().is_ok());
        assert!(document(json!({"_key": "abc"})).validate().is_ok());
    }

    #[test]
    fn validate_illegal_key() {
        let errors = document(json!({"_key": "a b"})).validate().unwrap_err();
        assert!(errors.field_errors().contains_key(KEY));
    }

    #[test]
    fn validate_key_type() {
        let errors = document(json!({"_key": 1})).validate().unwrap_err();
        assert_eq!("type", errors.field_errors()[KEY][0].code);
    }

    #[test]
    fn meta_ser() {
        let meta = DocumentMeta::new("datasets", "1", "2");
        assert_ser_tokens(
            &meta,
            &[
                Token::Struct {
                    name: "DocumentMeta",
                    len: 3,
                },
                Token::Str("_id"),
                Token::Str("datasets/1"),
                Token::Str("_key"),
                Token::Str("1"),
                Token::Str("_rev"),
                Token::Str("2"),
                Token::StructEnd,
            ],
        );
    }
}
