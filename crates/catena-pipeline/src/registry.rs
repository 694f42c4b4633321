//! Node registry: stable type identifiers mapped to reconstruction factories.
//!
//! The registry is the explicit, auditable set of node types a process can
//! deserialize. Populate it at startup, then share it read-only (it is
//! `Send + Sync`, so an `Arc<NodeRegistry>` or a `static` works).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use catena_types::{CatenaError, Document, Result};

use crate::node::{Node, NodeRef};
use crate::nodes::{ConstantNode, FavoriteColorNode, GreetNode};
use crate::sequence::{compose, SEQUENCE_TYPE};

/// Rebuilds a node from its configuration and already-reconstructed children.
pub type NodeFactory =
    Arc<dyn Fn(&Map<String, Value>, Vec<NodeRef>) -> Result<NodeRef> + Send + Sync>;

/// A node type that can be rebuilt from its configuration alone.
pub trait LeafNode: Node + Sized + 'static {
    const TYPE_ID: &'static str;

    fn from_config(config: &Map<String, Value>) -> Result<Self>;
}

// ---------------------------------------------------------------------------
// NodeRegistry
// ---------------------------------------------------------------------------

pub struct NodeRegistry {
    factories: HashMap<String, NodeFactory>,
}

impl NodeRegistry {
    /// An empty registry. Most callers want [`default_registry`].
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register `factory` under `type_id`. Registering an existing id
    /// replaces the previous factory.
    pub fn register<F>(&mut self, type_id: impl Into<String>, factory: F)
    where
        F: Fn(&Map<String, Value>, Vec<NodeRef>) -> Result<NodeRef> + Send + Sync + 'static,
    {
        let type_id = type_id.into();
        if self.factories.contains_key(&type_id) {
            tracing::warn!(type_id = %type_id, "Replacing existing node factory");
        } else {
            tracing::debug!(type_id = %type_id, "Registered node factory");
        }
        self.factories.insert(type_id, Arc::new(factory));
    }

    /// Register a [`LeafNode`] type under its `TYPE_ID`. Documents of this
    /// type must not carry children.
    pub fn register_leaf<T: LeafNode>(&mut self) {
        self.register(T::TYPE_ID, |config, children| {
            if !children.is_empty() {
                return Err(CatenaError::MalformedDocument(format!(
                    "node type '{}' does not accept children",
                    T::TYPE_ID
                )));
            }
            Ok(Arc::new(T::from_config(config)?) as NodeRef)
        });
    }

    /// Look up the factory for `type_id`.
    pub fn resolve(&self, type_id: &str) -> Result<&NodeFactory> {
        self.factories
            .get(type_id)
            .ok_or_else(|| CatenaError::UnknownType(type_id.to_string()))
    }

    pub fn has(&self, type_id: &str) -> bool {
        self.factories.contains_key(type_id)
    }

    /// All registered identifiers, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// Rebuild a node from `doc`. Same as [`codec::decode`](crate::codec::decode).
    pub fn restore(&self, doc: &Document) -> Result<NodeRef> {
        crate::codec::decode(doc, self)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Default registry factory
// ---------------------------------------------------------------------------

/// Registry with the composite `sequence` and all built-in leaf nodes.
///
/// The sequence factory re-runs the accumulation check on the rebuilt
/// children, so deserialization cannot bypass composition rules.
pub fn default_registry() -> NodeRegistry {
    let mut reg = NodeRegistry::new();
    reg.register(SEQUENCE_TYPE, |config, children| {
        if let Some(key) = config.keys().next() {
            return Err(CatenaError::MalformedDocument(format!(
                "unknown config key '{key}' for '{SEQUENCE_TYPE}'"
            )));
        }
        Ok(Arc::new(compose(children)?) as NodeRef)
    });
    reg.register_leaf::<GreetNode>();
    reg.register_leaf::<FavoriteColorNode>();
    reg.register_leaf::<ConstantNode>();
    reg
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
