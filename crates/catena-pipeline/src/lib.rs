//! Typed node composition, registry, and document codec.
//!
//! This crate implements the Catena core: the [`Node`] contract, eager
//! schema-accumulation checking in [`compose`], the [`Sequence`] composite,
//! the [`NodeRegistry`] of reconstruction factories, and the [`codec`] that
//! turns any node into a `{type, config}` document and back.

pub mod codec;
pub mod node;
pub mod nodes;
pub mod registry;
pub mod sequence;

pub use codec::{decode, decode_str, decode_value, encode, encode_pretty, CHILDREN_KEY, MAX_DEPTH};
pub use node::{invoke_leaf, Input, Node, NodeExt, NodeRef};
pub use nodes::{ConstantNode, FavoriteColorNode, GreetNode};
pub use registry::{default_registry, LeafNode, NodeFactory, NodeRegistry};
pub use sequence::{compose, then, Sequence, SEQUENCE_TYPE};

pub use catena_types::{CatenaError, Document, ErrorKind, FieldType, Record, Result, Schema};
