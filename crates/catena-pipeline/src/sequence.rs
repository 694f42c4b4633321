//! Composition: the accumulation check and the [`Sequence`] composite node.
//!
//! [`compose`] validates a chain of nodes eagerly, left to right, against the
//! running union of every field established so far (the "accumulated"
//! schema). The check runs once at build time and looks only at declared
//! schemas; [`Sequence::invoke`] never re-validates.

use std::sync::Arc;

use serde_json::{Map, Value};

use catena_types::{CatenaError, Record, Result, Schema};

use crate::node::{Input, Node, NodeRef};

/// Type identifier of [`Sequence`] in documents and registries.
pub const SEQUENCE_TYPE: &str = "sequence";

/// A composite node running its children strictly left to right.
///
/// Always holds at least one child, and every child's input schema is
/// satisfied by the fields accumulated before it.
#[derive(Debug, Clone)]
pub struct Sequence {
    children: Vec<NodeRef>,
    accumulated: Schema,
}

/// Chain `nodes` into a [`Sequence`].
///
/// Nested sequences are flattened so that `(a then b) then c` and
/// `a then (b then c)` produce the same child order and the same checks.
pub fn compose(nodes: impl IntoIterator<Item = NodeRef>) -> Result<Sequence> {
    let mut flat: Vec<NodeRef> = Vec::new();
    for node in nodes {
        match node.as_sequence() {
            Some(seq) => flat.extend(seq.children.iter().cloned()),
            None => flat.push(node),
        }
    }

    let first = flat.first().ok_or(CatenaError::EmptySequence)?;
    let mut accumulated = Schema::union(first.input_schema(), first.output_schema());

    for node in flat.iter().skip(1) {
        let required = node.input_schema();
        if !Schema::is_satisfied_by(required, &accumulated) {
            let missing = Schema::unsatisfied(required, &accumulated);
            tracing::debug!(node = %node.name(), missing = ?missing, "Composition rejected");
            return Err(CatenaError::IncompatibleSchema {
                node: node.name(),
                required: required.clone(),
                available: accumulated,
                missing,
            });
        }

        let collisions = Schema::collisions(&accumulated, node.output_schema());
        if !collisions.is_empty() {
            tracing::warn!(
                node = %node.name(),
                fields = ?collisions,
                "Output redeclares accumulated fields with a different type; keeping the earlier type"
            );
        }
        accumulated = Schema::union(&accumulated, node.output_schema());
    }

    tracing::debug!(nodes = flat.len(), accumulated = %accumulated, "Sequence composed");
    Ok(Sequence {
        children: flat,
        accumulated,
    })
}

/// Compose two nodes.
pub fn then(first: NodeRef, next: NodeRef) -> Result<Sequence> {
    compose([first, next])
}

impl Sequence {
    /// Append `next`, re-running the accumulation check.
    pub fn then(self, next: NodeRef) -> Result<Sequence> {
        compose([Arc::new(self) as NodeRef, next])
    }

    /// Every field guaranteed present after the last child runs.
    pub fn accumulated(&self) -> &Schema {
        &self.accumulated
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Always `false`; provided for symmetry with [`len`](Sequence::len).
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn first(&self) -> &NodeRef {
        &self.children[0]
    }

    fn last(&self) -> &NodeRef {
        &self.children[self.children.len() - 1]
    }
}

impl Node for Sequence {
    fn node_type(&self) -> &str {
        SEQUENCE_TYPE
    }

    fn name(&self) -> String {
        let names: Vec<String> = self.children.iter().map(|c| c.name()).collect();
        format!("({})", names.join(" >> "))
    }

    fn input_schema(&self) -> &Schema {
        self.first().input_schema()
    }

    fn output_schema(&self) -> &Schema {
        self.last().output_schema()
    }

    fn config(&self) -> Map<String, Value> {
        Map::new()
    }

    fn children(&self) -> &[NodeRef] {
        &self.children
    }

    fn as_sequence(&self) -> Option<&Sequence> {
        Some(self)
    }

    fn run(&self, input: &Input) -> Result<Record> {
        self.invoke(input.record())
    }

    /// Feed each child's output record to the next child. Stops at the first
    /// failure and returns it unchanged.
    fn invoke(&self, record: &Record) -> Result<Record> {
        let mut current = record.clone();
        for (i, child) in self.children.iter().enumerate() {
            current = child.invoke(&current).map_err(|e| {
                tracing::debug!(step = i, node = %child.name(), error = %e, "Sequence stopped");
                e
            })?;
        }
        Ok(current)
    }
}
