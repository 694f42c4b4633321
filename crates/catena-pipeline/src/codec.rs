//! Conversion between nodes and [`Document`]s.
//!
//! A document is `{"type": <type id>, "config": {...}}`. Composites keep
//! their child documents, in order, under [`CHILDREN_KEY`] inside `config`.
//! Decoding resolves the type through a [`NodeRegistry`], rebuilds children
//! depth-first, and hands both to the registered factory.

use serde_json::Value;

use catena_types::{CatenaError, Document, FieldType, Result};

use crate::node::{Node, NodeRef};
use crate::registry::NodeRegistry;

/// Reserved `config` key holding a composite's child documents.
pub const CHILDREN_KEY: &str = "children";

/// Number of nesting levels accepted by [`decode`], counting the root document.
pub const MAX_DEPTH: usize = 64;

/// Serialize `node`, recursively including any children.
pub fn encode<N: Node + ?Sized>(node: &N) -> Document {
    let mut config = node.config();
    let children = node.children();
    if !children.is_empty() {
        let docs = children
            .iter()
            .map(|child| encode(child.as_ref()).to_value())
            .collect();
        config.insert(CHILDREN_KEY.to_string(), Value::Array(docs));
    }
    Document::new(node.node_type(), config)
}

/// Serialize `node` to pretty-printed JSON.
pub fn encode_pretty<N: Node + ?Sized>(node: &N) -> Result<String> {
    encode(node).to_json_pretty()
}

/// Rebuild a node from `doc` using the factories in `registry`.
pub fn decode(doc: &Document, registry: &NodeRegistry) -> Result<NodeRef> {
    decode_at(doc, registry, 0)
}

/// [`decode`] starting from a parsed JSON value.
pub fn decode_value(value: Value, registry: &NodeRegistry) -> Result<NodeRef> {
    decode(&Document::from_value(value)?, registry)
}

/// [`decode`] starting from JSON text.
pub fn decode_str(s: &str, registry: &NodeRegistry) -> Result<NodeRef> {
    decode(&Document::from_json_str(s)?, registry)
}

fn decode_at(doc: &Document, registry: &NodeRegistry, depth: usize) -> Result<NodeRef> {
    if depth >= MAX_DEPTH {
        return Err(CatenaError::MalformedDocument(format!(
            "documents nested deeper than {MAX_DEPTH} levels"
        )));
    }

    let factory = registry.resolve(&doc.type_id)?;

    let mut config = doc.config.clone();
    let children = match config.remove(CHILDREN_KEY) {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let child = Document::from_value(item).map_err(|e| match e {
                    CatenaError::MalformedDocument(msg) => CatenaError::MalformedDocument(
                        format!("child {i} of '{}': {msg}", doc.type_id),
                    ),
                    other => other,
                })?;
                decode_at(&child, registry, depth + 1)
            })
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(CatenaError::MalformedDocument(format!(
                "'{CHILDREN_KEY}' of '{}' must be a list, found {}",
                doc.type_id,
                FieldType::of(&other)
            )))
        }
    };

    tracing::trace!(type_id = %doc.type_id, children = children.len(), depth, "Decoding node");
    factory(&config, children)
}
