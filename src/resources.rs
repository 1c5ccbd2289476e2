//! The catalogued resource types
//!
//! Every resource type is served by the same [crate::resource::ResourceHandler]; they differ only
//! in name and declared document shape.

use crate::shape::{DocumentShape, FieldKind, FieldSpec};

/// Static description of a resource type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResourceConfig {
    /// Plural name. Used as both the collection name and the mount path.
    pub name: &'static str,
    /// Singular name, used in log messages.
    pub singular: &'static str,
    /// Declared document fields.
    pub shape: DocumentShape,
}

pub const DATASETS: ResourceConfig = ResourceConfig {
    name: "datasets",
    singular: "dataset",
    shape: DocumentShape {
        fields: &[
            FieldSpec::required("name", FieldKind::String),
            FieldSpec::optional("description", FieldKind::String),
            FieldSpec::optional("format", FieldKind::String),
            FieldSpec::optional("uri", FieldKind::String),
            FieldSpec::optional("tags", FieldKind::Array),
        ],
    },
};

pub const MODELS: ResourceConfig = ResourceConfig {
    name: "models",
    singular: "model",
    shape: DocumentShape {
        fields: &[
            FieldSpec::required("name", FieldKind::String),
            FieldSpec::optional("description", FieldKind::String),
            FieldSpec::optional("framework", FieldKind::String),
            FieldSpec::optional("version", FieldKind::String),
            // Key of a dataset. Not checked for existence.
            FieldSpec::optional("dataset", FieldKind::String),
            FieldSpec::optional("parameters", FieldKind::Object),
        ],
    },
};

pub const EXPERIMENTS: ResourceConfig = ResourceConfig {
    name: "experiments",
    singular: "experiment",
    shape: DocumentShape {
        fields: &[
            FieldSpec::required("name", FieldKind::String),
            FieldSpec::optional("description", FieldKind::String),
            FieldSpec::optional("model", FieldKind::String),
            FieldSpec::optional("dataset", FieldKind::String),
            FieldSpec::optional("status", FieldKind::String),
            FieldSpec::optional("parameters", FieldKind::Object),
            FieldSpec::optional("metrics", FieldKind::Object),
        ],
    },
};

pub const NOTEBOOKS: ResourceConfig = ResourceConfig {
    name: "notebooks",
    singular: "notebook",
    shape: DocumentShape {
        fields: &[
            FieldSpec::required("name", FieldKind::String),
            FieldSpec::optional("description", FieldKind::String),
            FieldSpec::optional("experiment", FieldKind::String),
            FieldSpec::optional("language", FieldKind::String),
            FieldSpec::optional("cells", FieldKind::Array),
        ],
    },
};

/// All resource types, in mount order.
pub const ALL: [ResourceConfig; 4] = [DATASETS, MODELS, EXPERIMENTS, NOTEBOOKS];
