//! Built-in node library.

pub mod color;
pub mod constant;
pub mod greet;

pub use color::FavoriteColorNode;
pub use constant::ConstantNode;
pub use greet::GreetNode;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use catena_types::{CatenaError, Result};

/// Decode a node's `config` map into its typed configuration struct.
pub(crate) fn decode_config<T: DeserializeOwned>(
    type_id: &str,
    config: &Map<String, Value>,
) -> Result<T> {
    serde_json::from_value(Value::Object(config.clone())).map_err(|e| {
        CatenaError::MalformedDocument(format!("invalid config for '{type_id}': {e}"))
    })
}
