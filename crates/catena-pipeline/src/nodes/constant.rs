//! ConstantNode: a source node emitting fixed, configured fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use catena_types::{FieldType, Record, Result, Schema};

use crate::node::{Input, Node};
use crate::registry::LeafNode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstantConfig {
    fields: Map<String, Value>,
}

/// Requires nothing; outputs every configured field. Output types are
/// inferred from the values, `null` declaring an `any` field.
#[derive(Debug, Clone)]
pub struct ConstantNode {
    fields: Map<String, Value>,
    input: Schema,
    output: Schema,
}

impl ConstantNode {
    pub fn new(fields: Map<String, Value>) -> Self {
        let output = fields
            .iter()
            .fold(Schema::new("Constant"), |schema, (name, value)| {
                schema.field(name.as_str(), FieldType::of(value))
            });
        Self {
            fields,
            input: Schema::empty("Empty"),
            output,
        }
    }
}

impl Node for ConstantNode {
    fn node_type(&self) -> &str {
        Self::TYPE_ID
    }

    fn input_schema(&self) -> &Schema {
        &self.input
    }

    fn output_schema(&self) -> &Schema {
        &self.output
    }

    fn config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert("fields".into(), Value::Object(self.fields.clone()));
        config
    }

    fn run(&self, _input: &Input) -> Result<Record> {
        Ok(self.fields.clone().into())
    }
}

impl LeafNode for ConstantNode {
    const TYPE_ID: &'static str = "constant";

    fn from_config(config: &Map<String, Value>) -> Result<Self> {
        let cfg: ConstantConfig = super::decode_config(Self::TYPE_ID, config)?;
        Ok(Self::new(cfg.fields))
    }
}
