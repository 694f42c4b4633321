//! Node trait, schema-typed input view, and the record-level invoke wrapper.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use catena_types::{CatenaError, Document, FieldType, Record, Result, Schema};

use crate::sequence::Sequence;

/// Shared handle to an immutable node.
pub type NodeRef = Arc<dyn Node>;

// ---------------------------------------------------------------------------
// Node trait
// ---------------------------------------------------------------------------

/// A unit of computation mapping one record shape to another.
///
/// Schemas are fixed for a given configuration and must not depend on the
/// record passed at runtime. Everything that determines behavior, other than
/// child nodes, must be captured by [`config`](Node::config) so the node can
/// be rebuilt from its [`Document`].
pub trait Node: Send + Sync + fmt::Debug {
    /// Stable identifier resolvable through a [`NodeRegistry`](crate::NodeRegistry).
    fn node_type(&self) -> &str;

    /// Human-readable label used in diagnostics.
    fn name(&self) -> String {
        self.node_type().to_string()
    }

    fn input_schema(&self) -> &Schema;

    fn output_schema(&self) -> &Schema;

    /// Serializable configuration, excluding child nodes.
    fn config(&self) -> Map<String, Value>;

    /// Ordered child nodes of a composite. Empty for leaves.
    fn children(&self) -> &[NodeRef] {
        &[]
    }

    /// Downcast hook used by composition to flatten nested sequences.
    fn as_sequence(&self) -> Option<&Sequence> {
        None
    }

    /// The node's transformation: returns exactly the fields of
    /// [`output_schema`](Node::output_schema).
    fn run(&self, input: &Input) -> Result<Record>;

    /// Record-level wrapper around [`run`](Node::run). See [`invoke_leaf`].
    fn invoke(&self, record: &Record) -> Result<Record> {
        invoke_leaf(self, record)
    }
}

/// Extract the input schema's fields from `record`, call `run`, and merge the
/// output on top of a copy of `record`.
///
/// Inputs are checked for presence only; typed access happens through [`Input`].
/// A `run` that omits a declared output field, produces an undeclared one, or
/// produces a value of the wrong type fails with a transformation error
/// naming the producing node.
pub fn invoke_leaf<N: Node + ?Sized>(node: &N, record: &Record) -> Result<Record> {
    let name = node.name();
    tracing::trace!(node = %name, record = ?record, "Received record");

    let input = Input::extract(&name, node.input_schema(), record)?;
    let output = node.run(&input)?;

    let declared = node.output_schema();
    for field in declared.fields() {
        let Some(value) = output.get(&field.name) else {
            return Err(CatenaError::transformation(
                &name,
                format!("did not produce declared output field '{}'", field.name),
            ));
        };
        if !field.ty.accepts(value) {
            return Err(CatenaError::transformation(
                &name,
                format!(
                    "produced {} for output field '{}' declared as {}",
                    FieldType::of(value),
                    field.name,
                    field.ty
                ),
            ));
        }
    }
    if let Some(key) = output.keys().find(|k| !declared.contains(k)) {
        return Err(CatenaError::transformation(
            &name,
            format!("produced undeclared output field '{key}'"),
        ));
    }

    let result = record.merged(output);
    tracing::debug!(node = %name, fields = result.len(), "Node completed");
    tracing::trace!(node = %name, record = ?result, "Returning record");
    Ok(result)
}

/// Convenience methods available on every node.
pub trait NodeExt: Node {
    /// Serialize this node (recursively, for composites) to a [`Document`].
    fn to_document(&self) -> Document {
        crate::codec::encode(self)
    }
}

impl<T: Node + ?Sized> NodeExt for T {}

// ---------------------------------------------------------------------------
// Input — schema-typed view handed to `run`
// ---------------------------------------------------------------------------

/// The fields of a record selected by a node's input schema.
#[derive(Debug, Clone)]
pub struct Input {
    node: String,
    values: Record,
}

impl Input {
    /// Select `schema`'s fields from `record`, failing with
    /// [`CatenaError::MissingField`] on the first absent one.
    pub fn extract(node: &str, schema: &Schema, record: &Record) -> Result<Self> {
        let mut values = Record::new();
        for field in schema.fields() {
            let value = record.get(&field.name).ok_or_else(|| CatenaError::MissingField {
                node: node.to_string(),
                field: field.name.clone(),
            })?;
            values.insert(field.name.clone(), value.clone());
        }
        Ok(Self {
            node: node.to_string(),
            values,
        })
    }

    /// Name of the node this input was extracted for.
    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn record(&self) -> &Record {
        &self.values
    }

    pub fn value(&self, field: &str) -> Result<&Value> {
        self.values.get(field).ok_or_else(|| CatenaError::MissingField {
            node: self.node.clone(),
            field: field.to_string(),
        })
    }

    pub fn str(&self, field: &str) -> Result<&str> {
        let value = self.value(field)?;
        value.as_str().ok_or_else(|| self.mismatch(field, FieldType::String, value))
    }

    pub fn i64(&self, field: &str) -> Result<i64> {
        let value = self.value(field)?;
        value.as_i64().ok_or_else(|| self.mismatch(field, FieldType::Integer, value))
    }

    pub fn f64(&self, field: &str) -> Result<f64> {
        let value = self.value(field)?;
        value.as_f64().ok_or_else(|| self.mismatch(field, FieldType::Float, value))
    }

    pub fn bool(&self, field: &str) -> Result<bool> {
        let value = self.value(field)?;
        value.as_bool().ok_or_else(|| self.mismatch(field, FieldType::Boolean, value))
    }

    fn mismatch(&self, field: &str, expected: FieldType, found: &Value) -> CatenaError {
        CatenaError::TypeMismatch {
            node: self.node.clone(),
            field: field.to_string(),
            expected,
            found: FieldType::of(found),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Doubles `value`; declares `doubled` as output.
    #[derive(Debug)]
    struct Doubler {
        input: Schema,
        output: Schema,
    }

    impl Doubler {
        fn new() -> Self {
            Self {
                input: Schema::new("Value").field("value", FieldType::Integer),
                output: Schema::new("Doubled").field("doubled", FieldType::Integer),
            }
        }
    }

    impl Node for Doubler {
        fn node_type(&self) -> &str {
            "doubler"
        }
        fn input_schema(&self) -> &Schema {
            &self.input
        }
        fn output_schema(&self) -> &Schema {
            &self.output
        }
        fn config(&self) -> Map<String, Value> {
            Map::new()
        }
        fn run(&self, input: &Input) -> Result<Record> {
            Ok(Record::new().with("doubled", input.i64("value")? * 2))
        }
    }

    /// Declares an output it never produces.
    #[derive(Debug)]
    struct Forgetful(Schema, Schema);

    impl Node for Forgetful {
        fn node_type(&self) -> &str {
            "forgetful"
        }
        fn input_schema(&self) -> &Schema {
            &self.0
        }
        fn output_schema(&self) -> &Schema {
            &self.1
        }
        fn config(&self) -> Map<String, Value> {
            Map::new()
        }
        fn run(&self, _input: &Input) -> Result<Record> {
            Ok(Record::new().with("surprise", 1))
        }
    }

    // --- invoke ---

    #[test]
    fn invoke_merges_output_and_passes_other_fields_through() {
        let record = Record::new().with("value", 21).with("extra", "keep me");
        let out = Doubler::new().invoke(&record).unwrap();
        assert_eq!(out.get("doubled"), Some(&json!(42)));
        assert_eq!(out.get("value"), Some(&json!(21)));
        assert_eq!(out.get("extra"), Some(&json!("keep me")));
        // Input untouched
        assert!(!record.contains("doubled"));
    }

    #[test]
    fn invoke_output_overrides_same_named_input() {
        let record = Record::new().with("value", 2).with("doubled", 0);
        let out = Doubler::new().invoke(&record).unwrap();
        assert_eq!(out.get("doubled"), Some(&json!(4)));
    }

    #[test]
    fn invoke_missing_field_is_schema_error() {
        let err = Doubler::new().invoke(&Record::new()).unwrap_err();
        match err {
            CatenaError::MissingField { node, field } => {
                assert_eq!(node, "doubler");
                assert_eq!(field, "value");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invoke_checks_presence_only_typed_access_reports_mismatch() {
        let record = Record::new().with("value", "twenty");
        let err = Doubler::new().invoke(&record).unwrap_err();
        assert!(matches!(
            err,
            CatenaError::TypeMismatch {
                expected: FieldType::Integer,
                found: FieldType::String,
                ..
            }
        ));
    }

    #[test]
    fn invoke_rejects_output_not_matching_declaration() {
        let node = Forgetful(
            Schema::empty("Nothing"),
            Schema::new("Out").field("promised", FieldType::String),
        );
        let err = node.invoke(&Record::new()).unwrap_err();
        assert!(matches!(err, CatenaError::Transformation { .. }));
        assert!(err.to_string().contains("promised"));

        let node = Forgetful(Schema::empty("Nothing"), Schema::empty("Nothing"));
        let err = node.invoke(&Record::new()).unwrap_err();
        assert!(err.to_string().contains("undeclared output field 'surprise'"));
    }

    #[test]
    fn invoke_rejects_output_of_wrong_type() {
        #[derive(Debug)]
        struct BadGreeter(Schema, Schema);

        impl Node for BadGreeter {
            fn node_type(&self) -> &str {
                "bad_greeter"
            }
            fn input_schema(&self) -> &Schema {
                &self.0
            }
            fn output_schema(&self) -> &Schema {
                &self.1
            }
            fn config(&self) -> Map<String, Value> {
                Map::new()
            }
            fn run(&self, _input: &Input) -> Result<Record> {
                Ok(Record::new().with("greeting", 5))
            }
        }

        let bad: NodeRef = Arc::new(BadGreeter(
            Schema::empty("Nothing"),
            Schema::new("Greeting").field("greeting", FieldType::String),
        ));
        let color: NodeRef = Arc::new(crate::nodes::FavoriteColorNode::new("red"));
        let seq = crate::sequence::compose([bad, color]).unwrap();

        let err = seq.invoke(&Record::new()).unwrap_err();
        match err {
            CatenaError::Transformation { node, message } => {
                assert_eq!(node, "bad_greeter");
                assert_eq!(
                    message,
                    "produced integer for output field 'greeting' declared as string"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    // --- Input ---

    #[test]
    fn extract_keeps_only_schema_fields() {
        let schema = Schema::new("S").field("a", FieldType::Integer);
        let record = Record::new().with("a", 1).with("b", 2);
        let input = Input::extract("n", &schema, &record).unwrap();
        assert_eq!(input.record().len(), 1);
        assert_eq!(input.node(), "n");
        assert_eq!(input.i64("a").unwrap(), 1);
        assert!(matches!(
            input.value("b").unwrap_err(),
            CatenaError::MissingField { .. }
        ));
    }

    #[test]
    fn typed_accessors() {
        let schema = Schema::new("S")
            .field("s", FieldType::String)
            .field("f", FieldType::Float)
            .field("b", FieldType::Boolean);
        let record = Record::new().with("s", "x").with("f", 1.5).with("b", true);
        let input = Input::extract("n", &schema, &record).unwrap();
        assert_eq!(input.str("s").unwrap(), "x");
        assert_eq!(input.f64("f").unwrap(), 1.5);
        assert!(input.bool("b").unwrap());
        assert!(matches!(
            input.bool("s").unwrap_err(),
            CatenaError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn leaf_document_has_no_children_key() {
        let doc = Doubler::new().to_document();
        assert_eq!(doc.type_id, "doubler");
        assert!(doc.config.is_empty());
    }
}
