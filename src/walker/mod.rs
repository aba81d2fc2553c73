//! Reference Walker (spec §4.3).
//!
//! Parses a schema body according to its declared type and produces a
//! dependency graph of named types plus the set of already-declared
//! cross-subject references. The internal representation is an explicit
//! tagged-variant tree so the rest of the core never pattern-matches on a
//! loosely typed `serde_json::Value`.

pub mod avro;
pub mod jsonschema;
pub mod protobuf;

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::types::SchemaType;

/// One node of a parsed schema body.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Primitive(String),
    /// A reference to a type declared elsewhere in the body (or, once
    /// resolved by the caller, in another subject).
    Named(String),
    Union(Vec<SchemaNode>),
    Array(Box<SchemaNode>),
    Map(Box<SchemaNode>),
    Record {
        name: String,
        namespace: Option<String>,
        fields: Vec<(String, SchemaNode)>,
    },
    Enum {
        name: String,
        namespace: Option<String>,
        symbols: Vec<String>,
    },
    Fixed {
        name: String,
        namespace: Option<String>,
        size: usize,
    },
}

/// Structural output of walking one schema body.
#[derive(Debug, Clone, Default)]
pub struct WalkResult {
    /// Direct dependency edges, keyed by the depending type's qualified name.
    pub graph: BTreeMap<String, Vec<String>>,
    /// Every named type encountered, keyed by qualified name.
    pub nodes: BTreeMap<String, SchemaNode>,
    /// The type not referenced by any other type found in the body.
    pub root: Option<String>,
}

/// Recursively collects every [`SchemaNode::Named`] reachable from `node`
/// without crossing into another named type's own definition.
pub fn collect_named(node: &SchemaNode) -> Vec<String> {
    match node {
        SchemaNode::Named(name) => vec![name.clone()],
        SchemaNode::Union(nodes) => nodes.iter().flat_map(collect_named).collect(),
        SchemaNode::Array(inner) | SchemaNode::Map(inner) => collect_named(inner),
        SchemaNode::Primitive(_)
        | SchemaNode::Record { .. }
        | SchemaNode::Enum { .. }
        | SchemaNode::Fixed { .. } => Vec::new(),
    }
}

pub fn walk(schema_type: SchemaType, body: &str) -> Result<WalkResult, ParseError> {
    match schema_type {
        SchemaType::Avro => avro::walk(body),
        SchemaType::Protobuf => protobuf::walk(body),
        SchemaType::Json => jsonschema::walk(body),
    }
}
