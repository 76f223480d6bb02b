//! Structural type checks for JSON bodies.
//!
//! # Design
//! A `Shape` maps field names to `TypeDeclaration`s. Validation walks the
//! declaration, not the value: undeclared fields in the value are ignored,
//! declared fields must be present and of the declared kind. Every mismatch
//! is collected; nothing here fails fast or returns an error.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Runtime kind of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JsonKind::Null => "null",
            JsonKind::Boolean => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        })
    }
}

/// Declared type of a single JSON value.
///
/// Serialized as `"number"`, `"string"`, `"boolean"`, `"any"`,
/// `{"array_of": <decl>}` or `{"object": {<field>: <decl>, ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDeclaration {
    Number,
    String,
    Boolean,
    ArrayOf(Box<TypeDeclaration>),
    Object(Shape),
    Any,
}

impl TypeDeclaration {
    /// An array with unconstrained elements.
    pub fn array() -> Self {
        TypeDeclaration::ArrayOf(Box::new(TypeDeclaration::Any))
    }

    pub fn array_of(element: TypeDeclaration) -> Self {
        TypeDeclaration::ArrayOf(Box::new(element))
    }

    /// Human-readable form used in mismatch details.
    pub fn describe(&self) -> String {
        match self {
            TypeDeclaration::Number => "number".to_string(),
            TypeDeclaration::String => "string".to_string(),
            TypeDeclaration::Boolean => "boolean".to_string(),
            TypeDeclaration::ArrayOf(inner) => match inner.as_ref() {
                TypeDeclaration::Any => "array".to_string(),
                other => format!("array<{}>", other.describe()),
            },
            TypeDeclaration::Object(_) => "object".to_string(),
            TypeDeclaration::Any => "any".to_string(),
        }
    }

    /// Check `value` at `path`, appending mismatches to `out`.
    pub fn check(&self, value: &Value, path: &str, out: &mut Vec<Mismatch>) {
        let actual = JsonKind::of(value);
        match self {
            TypeDeclaration::Any => {}
            TypeDeclaration::Number => expect_kind(JsonKind::Number, actual, self, path, out),
            TypeDeclaration::String => expect_kind(JsonKind::String, actual, self, path, out),
            TypeDeclaration::Boolean => expect_kind(JsonKind::Boolean, actual, self, path, out),
            TypeDeclaration::ArrayOf(element) => match value.as_array() {
                Some(items) => {
                    for (i, item) in items.iter().enumerate() {
                        element.check(item, &format!("{path}[{i}]"), out);
                    }
                }
                None => out.push(Mismatch::TypeMismatch {
                    path: path.to_string(),
                    expected: self.describe(),
                    actual,
                }),
            },
            TypeDeclaration::Object(shape) => check_object(value, shape, path, out),
        }
    }
}

fn expect_kind(
    wanted: JsonKind,
    actual: JsonKind,
    decl: &TypeDeclaration,
    path: &str,
    out: &mut Vec<Mismatch>,
) {
    if wanted != actual {
        out.push(Mismatch::TypeMismatch {
            path: path.to_string(),
            expected: decl.describe(),
            actual,
        });
    }
}

/// Field name to declared type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(BTreeMap<String, TypeDeclaration>);

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, decl: TypeDeclaration) -> Self {
        self.0.insert(name.into(), decl);
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &TypeDeclaration)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, TypeDeclaration)> for Shape {
    fn from_iter<I: IntoIterator<Item = (K, TypeDeclaration)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// One field-level disagreement between a value and its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    MissingField {
        path: String,
    },
    TypeMismatch {
        path: String,
        expected: String,
        actual: JsonKind,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::MissingField { path } => write!(f, "missing field `{path}`"),
            Mismatch::TypeMismatch {
                path,
                expected,
                actual,
            } => {
                let path = if path.is_empty() { "<root>" } else { path };
                write!(f, "`{path}`: expected {expected}, got {actual}")
            }
        }
    }
}

/// Validate `value` against `shape`. An empty result means it conforms.
pub fn validate(value: &Value, shape: &Shape) -> Vec<Mismatch> {
    let mut out = Vec::new();
    check_object(value, shape, "", &mut out);
    out
}

fn check_object(value: &Value, shape: &Shape, path: &str, out: &mut Vec<Mismatch>) {
    let Some(map) = value.as_object() else {
        out.push(Mismatch::TypeMismatch {
            path: path.to_string(),
            expected: "object".to_string(),
            actual: JsonKind::of(value),
        });
        return;
    };

    for (name, decl) in shape.fields() {
        let field_path = if path.is_empty() {
            name.to_string()
        } else {
            format!("{path}.{name}")
        };
        match map.get(name) {
            Some(field) => decl.check(field, &field_path, out),
            None => out.push(Mismatch::MissingField { path: field_path }),
        }
    }
}
