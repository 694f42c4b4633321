//! GreetNode: formats a greeting from a person's name and age.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use catena_types::{CatenaError, FieldType, Record, Result, Schema};

use crate::node::{Input, Node};
use crate::registry::LeafNode;

pub const DEFAULT_GREETING_FORMAT: &str = "Hello {name}, you are {age} years old.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct GreetConfig {
    #[serde(default = "default_greeting_format")]
    greeting_format: String,
}

fn default_greeting_format() -> String {
    DEFAULT_GREETING_FORMAT.to_string()
}

/// `Person { name, age }` -> `Greeting { greeting }`.
///
/// `{field}` placeholders in the format are replaced by input values;
/// `{{` and `}}` produce literal braces.
#[derive(Debug, Clone)]
pub struct GreetNode {
    greeting_format: String,
    input: Schema,
    output: Schema,
}

impl GreetNode {
    pub fn new(greeting_format: impl Into<String>) -> Self {
        Self {
            greeting_format: greeting_format.into(),
            input: Schema::new("Person")
                .field("name", FieldType::String)
                .field("age", FieldType::Integer),
            output: Schema::new("Greeting").field("greeting", FieldType::String),
        }
    }

    pub fn greeting_format(&self) -> &str {
        &self.greeting_format
    }

    fn render(&self, input: &Input) -> Result<String> {
        let template = self.greeting_format.as_str();
        let mut out = String::with_capacity(template.len());
        let mut last = 0;

        for caps in placeholder_pattern().captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            self.push_literal(&mut out, &template[last..whole.start()])?;
            match whole.as_str() {
                "{{" => out.push('{'),
                "}}" => out.push('}'),
                _ => {
                    let key = caps.get(1).map_or("", |m| m.as_str()).trim();
                    if !self.input.contains(key) {
                        return Err(CatenaError::transformation(
                            self.name(),
                            format!("greeting format references unknown field '{key}'"),
                        ));
                    }
                    match input.value(key)? {
                        Value::String(s) => out.push_str(s),
                        other => out.push_str(&other.to_string()),
                    }
                }
            }
            last = whole.end();
        }
        self.push_literal(&mut out, &template[last..])?;
        Ok(out)
    }

    fn push_literal(&self, out: &mut String, literal: &str) -> Result<()> {
        if literal.contains(['{', '}']) {
            return Err(CatenaError::transformation(
                self.name(),
                format!("unbalanced brace in greeting format '{}'", self.greeting_format),
            ));
        }
        out.push_str(literal);
        Ok(())
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("placeholder pattern is valid")
    })
}

impl Default for GreetNode {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING_FORMAT)
    }
}

impl Node for GreetNode {
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
        config.insert(
            "greeting_format".into(),
            Value::String(self.greeting_format.clone()),
        );
        config
    }

    fn run(&self, input: &Input) -> Result<Record> {
        Ok(Record::new().with("greeting", self.render(input)?))
    }
}

impl LeafNode for GreetNode {
    const TYPE_ID: &'static str = "greet";

    fn from_config(config: &Map<String, Value>) -> Result<Self> {
        let cfg: GreetConfig = super::decode_config(Self::TYPE_ID, config)?;
        Ok(Self::new(cfg.greeting_format))
    }
}
