//! Shared types and errors for the Catena pipeline core.
//!
//! This crate provides the data model every other Catena crate builds on:
//! - `CatenaError` — unified error taxonomy
//! - `Record` — the dynamically-typed key-value payload threaded through a pipeline
//! - `Schema` / `FieldType` — declared record shapes used for build-time checks
//! - `Document` — the interchange-safe `{type, config}` form of a node

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unified error type for all Catena subsystems.
#[derive(Debug, thiserror::Error)]
pub enum CatenaError {
    // === Composition Errors ===
    #[error("Cannot compose an empty sequence: at least one node is required")]
    EmptySequence,

    #[error(
        "Cannot compose node '{node}': requires {required} but only {available} is available (unsatisfied: {})",
        .missing.join(", ")
    )]
    IncompatibleSchema {
        node: String,
        required: Schema,
        available: Schema,
        missing: Vec<String>,
    },

    // === Schema Errors ===
    #[error("Node '{node}' is missing required field '{field}'")]
    MissingField { node: String, field: String },

    #[error("Node '{node}' expected field '{field}' to be {expected}, found {found}")]
    TypeMismatch {
        node: String,
        field: String,
        expected: FieldType,
        found: FieldType,
    },

    // === Node Errors ===
    #[error("Node '{node}' failed: {message}")]
    Transformation { node: String, message: String },

    // === Serialization Errors ===
    #[error("Unknown node type '{0}': no factory registered")]
    UnknownType(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`CatenaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Composition,
    Schema,
    Transformation,
    Serialization,
    Io,
}

impl CatenaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatenaError::EmptySequence | CatenaError::IncompatibleSchema { .. } => {
                ErrorKind::Composition
            }
            CatenaError::MissingField { .. } | CatenaError::TypeMismatch { .. } => {
                ErrorKind::Schema
            }
            CatenaError::Transformation { .. } => ErrorKind::Transformation,
            CatenaError::UnknownType(_)
            | CatenaError::MalformedDocument(_)
            | CatenaError::Json(_) => ErrorKind::Serialization,
            CatenaError::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns `true` if the error can only be raised while building a pipeline,
    /// never while executing one.
    pub fn is_build_time(&self) -> bool {
        self.kind() == ErrorKind::Composition
    }

    /// Shorthand for a [`CatenaError::Transformation`] raised by a node's own logic.
    pub fn transformation(node: impl Into<String>, message: impl Into<String>) -> Self {
        CatenaError::Transformation {
            node: node.into(),
            message: message.into(),
        }
    }
}

/// A convenience alias for `Result<T, CatenaError>`.
pub type Result<T> = std::result::Result<T, CatenaError>;

// ---------------------------------------------------------------------------
// Record — runtime payload threaded through a pipeline
// ---------------------------------------------------------------------------

/// Mapping from field name to a dynamically-typed value.
///
/// Nodes never mutate the record they receive; they produce a new one via
/// [`merged`](Record::merged).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Insert or overwrite a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy of `self` with every field of `output` applied on top.
    /// Fields of `output` win on key collision; all other fields pass through.
    pub fn merged(&self, output: Record) -> Record {
        let mut values = self.values.clone();
        values.extend(output.values);
        Record { values }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values.into_iter().collect())
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record {
            values: map.into_iter().collect(),
        }
    }
}

impl TryFrom<Value> for Record {
    type Error = CatenaError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(map.into()),
            other => Err(CatenaError::MalformedDocument(format!(
                "record must be a JSON object, found {}",
                FieldType::of(&other)
            ))),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Record {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// FieldType — semantic type tag of a schema field
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Object,
    /// Wildcard: a required `Any` field is satisfied by a field of any type.
    Any,
}

impl FieldType {
    /// Classify a runtime value. `null` has no meaningful tag and maps to `Any`.
    pub fn of(value: &Value) -> FieldType {
        match value {
            Value::Null => FieldType::Any,
            Value::Bool(_) => FieldType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
            Value::Number(_) => FieldType::Float,
            Value::String(_) => FieldType::String,
            Value::Array(_) => FieldType::List,
            Value::Object(_) => FieldType::Object,
        }
    }

    /// Whether a runtime value conforms to this tag. `Float` accepts any number.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::Any => true,
            FieldType::Float => value.is_number(),
            other => FieldType::of(value) == other,
        }
    }

    /// Whether a field declared as `available` meets a requirement of `self`.
    pub fn is_satisfied_by(self, available: FieldType) -> bool {
        self == FieldType::Any || self == available
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::List => "list",
            FieldType::Object => "object",
            FieldType::Any => "any",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Schema — named, ordered set of typed fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

/// Immutable description of a record shape.
///
/// The name is for diagnostics only; compatibility is structural
/// (see [`Schema::is_satisfied_by`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Alias for a schema with no fields, e.g. the input of a source node.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name)
    }

    /// Builder-style field declaration. Re-declaring an existing name keeps
    /// the first declaration.
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        let name = name.into();
        if !self.contains(&name) {
            self.fields.push(Field { name, ty });
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<FieldType> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.ty)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge two schemas. On a name collision the type from `a` wins.
    pub fn union(a: &Schema, b: &Schema) -> Schema {
        let name = if a.name == b.name || b.is_empty() {
            a.name.clone()
        } else {
            format!("{} + {}", a.name, b.name)
        };
        let mut fields = a.fields.clone();
        for f in &b.fields {
            if !a.contains(&f.name) {
                fields.push(f.clone());
            }
        }
        Schema { name, fields }
    }

    /// Names present in both schemas with differing types. These are the
    /// fields whose `b` type [`union`](Schema::union) discards.
    pub fn collisions(a: &Schema, b: &Schema) -> Vec<String> {
        b.fields
            .iter()
            .filter(|f| matches!(a.get(&f.name), Some(ty) if ty != f.ty))
            .map(|f| f.name.clone())
            .collect()
    }

    /// True iff every field in `required` exists in `available` with a matching
    /// type. Field order and extra fields in `available` are irrelevant.
    pub fn is_satisfied_by(required: &Schema, available: &Schema) -> bool {
        required.fields.iter().all(|f| {
            available
                .get(&f.name)
                .is_some_and(|ty| f.ty.is_satisfied_by(ty))
        })
    }

    /// Fields of `required` that `available` does not satisfy, rendered as
    /// `name: type` for diagnostics.
    pub fn unsatisfied(required: &Schema, available: &Schema) -> Vec<String> {
        required
            .fields
            .iter()
            .filter(|f| {
                !available
                    .get(&f.name)
                    .is_some_and(|ty| f.ty.is_satisfied_by(ty))
            })
            .map(|f| format!("{}: {}", f.name, f.ty))
            .collect()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{}: {}", field.name, field.ty)?;
        }
        if self.fields.is_empty() {
            f.write_str("}")
        } else {
            f.write_str(" }")
        }
    }
}

// ---------------------------------------------------------------------------
// Document — interchange-safe form of a node
// ---------------------------------------------------------------------------

/// `{ "type": <type id>, "config": { ... } }`.
///
/// Composite nodes store their child documents in `config` under a reserved
/// key; see `catena_pipeline::codec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    #[serde(rename = "type")]
    pub type_id: String,
    pub config: Map<String, Value>,
}

impl Document {
    pub fn new(type_id: impl Into<String>, config: Map<String, Value>) -> Self {
        Self {
            type_id: type_id.into(),
            config,
        }
    }

    /// Decode a document from an already-parsed JSON value.
    ///
    /// Missing or mistyped members yield [`CatenaError::MalformedDocument`].
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(CatenaError::MalformedDocument(format!(
                "document must be a JSON object, found {}",
                FieldType::of(&value)
            )));
        }
        let doc: Document = serde_json::from_value(value)
            .map_err(|e| CatenaError::MalformedDocument(e.to_string()))?;
        if doc.type_id.trim().is_empty() {
            return Err(CatenaError::MalformedDocument(
                "member 'type' must be a non-empty string".into(),
            ));
        }
        Ok(doc)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), Value::String(self.type_id.clone()));
        map.insert("config".into(), Value::Object(self.config.clone()));
        Value::Object(map)
    }

    /// Parse a document from JSON text. Invalid JSON is a [`CatenaError::Json`];
    /// valid JSON with the wrong shape is a [`CatenaError::MalformedDocument`].
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(value)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize this document to pretty JSON and write it to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        tracing::debug!(path = %path.display(), type_id = %self.type_id, "Document saved");
        Ok(())
    }

    /// Read a document from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }
}
