//! Per-resource document shapes
//!
//! A [DocumentShape] declares the fields a resource type knows about. Declared fields are type
//! checked on the way in; any other fields are passed through untouched.

use crate::document::Document;

use serde_json::Value;
use std::borrow::Cow;
use strum_macros::Display;
use validator::{ValidationError, ValidationErrors};

/// JSON type of a declared field
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldKind {
    /// Returns whether `value` is of this kind.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

/// A declared document field
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldSpec {
    /// Field name
    pub name: &'static str,
    /// Expected JSON type
    pub kind: FieldKind,
    /// Whether a full document must contain a non-null value for the field
    pub required: bool,
}

impl FieldSpec {
    /// A field that must be present.
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    /// A field that may be absent or null.
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// The declared fields of a resource type
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DocumentShape {
    pub fields: &'static [FieldSpec],
}

impl DocumentShape {
    /// Validate a complete document, as received by create and replace.
    pub fn validate_full(&self, document: &Document) -> Result<(), ValidationErrors> {
        self.validate(document, false)
    }

    /// Validate a partial document, as received by update.
    ///
    /// Absent fields are fine, but provided fields must still be of the declared kind and
    /// required fields may not be nulled out.
    pub fn validate_partial(&self, document: &Document) -> Result<(), ValidationErrors> {
        self.validate(document, true)
    }

    fn validate(&self, document: &Document, partial: bool) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for field in self.fields {
            match document.get(field.name) {
                None if field.required && !partial => {
                    errors.add(field.name, missing(field));
                }
                None => (),
                Some(Value::Null) if field.required => {
                    errors.add(field.name, missing(field));
                }
                Some(Value::Null) => (),
                Some(value) if !field.kind.matches(value) => {
                    errors.add(field.name, wrong_kind(field));
                }
                Some(_) => (),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn missing(field: &FieldSpec) -> ValidationError {
    let mut error = ValidationError::new("required");
    error.message = Some(Cow::from(format!("{} is required", field.name)));
    error
}

fn wrong_kind(field: &FieldSpec) -> ValidationError {
    let mut error = ValidationError::new("type");
    error.message = Some(Cow::from(format!(
        "{} must be of type {}",
        field.name, field.kind
    )));
    error.add_param(Cow::from("expected"), &field.kind.to_string());
    error
}
