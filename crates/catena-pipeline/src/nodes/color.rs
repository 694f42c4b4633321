//! FavoriteColorNode: attaches a configured favorite color to a greeted record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use catena_types::{FieldType, Record, Result, Schema};

use crate::node::{Input, Node};
use crate::registry::LeafNode;

pub const DEFAULT_COLOR: &str = "blue";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColorConfig {
    #[serde(default = "default_color")]
    color: String,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

/// `Greeting { greeting }` -> `FavoriteColor { favorite_color }`.
#[derive(Debug, Clone)]
pub struct FavoriteColorNode {
    color: String,
    input: Schema,
    output: Schema,
}

impl FavoriteColorNode {
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            input: Schema::new("Greeting").field("greeting", FieldType::String),
            output: Schema::new("FavoriteColor").field("favorite_color", FieldType::String),
        }
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

impl Default for FavoriteColorNode {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR)
    }
}

impl Node for FavoriteColorNode {
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
        config.insert("color".into(), Value::String(self.color.clone()));
        config
    }

    fn run(&self, input: &Input) -> Result<Record> {
        // The greeting is required but only its type is checked.
        input.str("greeting")?;
        Ok(Record::new().with("favorite_color", self.color.as_str()))
    }
}

impl LeafNode for FavoriteColorNode {
    const TYPE_ID: &'static str = "favorite_color";

    fn from_config(config: &Map<String, Value>) -> Result<Self> {
        let cfg: ColorConfig = super::decode_config(Self::TYPE_ID, config)?;
        Ok(Self::new(cfg.color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catena_types::CatenaError;
    use serde_json::json;

    #[test]
    fn adds_favorite_color() {
        let node = FavoriteColorNode::new("red");
        let out = node
            .invoke(&Record::new().with("greeting", "Hello world!"))
            .unwrap();
        assert_eq!(out.get("greeting"), Some(&json!("Hello world!")));
        assert_eq!(out.get("favorite_color"), Some(&json!("red")));
    }

    #[test]
    fn missing_greeting() {
        let err = FavoriteColorNode::default().invoke(&Record::new()).unwrap_err();
        assert!(matches!(
            err,
            CatenaError::MissingField { ref field, .. } if field == "greeting"
        ));
    }

    #[test]
    fn non_string_greeting_is_type_mismatch() {
        let err = FavoriteColorNode::default()
            .invoke(&Record::new().with("greeting", 5))
            .unwrap_err();
        assert!(matches!(err, CatenaError::TypeMismatch { .. }));
    }

    #[test]
    fn default_color_applies_when_config_is_empty() {
        let node = FavoriteColorNode::from_config(&Map::new()).unwrap();
        assert_eq!(node.color(), DEFAULT_COLOR);
    }

    #[test]
    fn from_config_rejects_non_string_color() {
        let mut config = Map::new();
        config.insert("color".into(), json!(42));
        assert!(matches!(
            FavoriteColorNode::from_config(&config).unwrap_err(),
            CatenaError::MalformedDocument(_)
        ));
    }
}
