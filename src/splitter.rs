//! Schema Splitter (spec §4.4).
//!
//! Breaks one monolithic schema into a set of independently registrable
//! types, ordered so that every reference's target is registered before its
//! parent. Full min-size inlining (rebuild-from-original, §4.4 step 4) is
//! implemented for Avro, whose walker produces a fully structured node
//! graph. Protobuf and JSON Schema extract every top-level type regardless
//! of size — see DESIGN.md for the reasoning.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};

use crate::error::ParseError;
use crate::types::{ExtractedType, SchemaType, SplitResult};
use crate::walker::{self, protobuf::extract_top_level_messages, SchemaNode, WalkResult};

#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Types whose rendered definition is smaller than this (in bytes) are
    /// inlined into their parent instead of being extracted. Ignored for
    /// Protobuf and JSON Schema.
    pub min_extract_size: usize,
    /// Prepended to every derived subject name, e.g. `"orders."`.
    pub subject_prefix: String,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            min_extract_size: 0,
            subject_prefix: String::new(),
        }
    }
}

pub fn split(
    schema_type: SchemaType,
    body: &str,
    config: &SplitConfig,
) -> Result<SplitResult, ParseError> {
    match schema_type {
        SchemaType::Avro => split_avro(body, config),
        SchemaType::Protobuf => split_protobuf(body, config),
        SchemaType::Json => split_jsonschema(body, config),
    }
}

fn short_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

fn subject_for(config: &SplitConfig, qualified_name: &str) -> String {
    format!("{}{}", config.subject_prefix, qualified_name)
}

// ---------------------------------------------------------------- Avro ----

fn render_node(
    node: &SchemaNode,
    survivors: &BTreeSet<String>,
    nodes: &BTreeMap<String, SchemaNode>,
    effective_refs: &mut Vec<String>,
) -> Value {
    match node {
        SchemaNode::Primitive(p) => Value::String(p.clone()),
        SchemaNode::Named(name) => {
            if survivors.contains(name) {
                effective_refs.push(name.clone());
                Value::String(name.clone())
            } else if let Some(inner) = nodes.get(name) {
                render_node(inner, survivors, nodes, effective_refs)
            } else {
                Value::String(name.clone())
            }
        }
        SchemaNode::Union(items) => Value::Array(
            items
                .iter()
                .map(|n| render_node(n, survivors, nodes, effective_refs))
                .collect(),
        ),
        SchemaNode::Array(inner) => json!({
            "type": "array",
            "items": render_node(inner, survivors, nodes, effective_refs),
        }),
        SchemaNode::Map(inner) => json!({
            "type": "map",
            "values": render_node(inner, survivors, nodes, effective_refs),
        }),
        SchemaNode::Record {
            name,
            namespace,
            fields,
        } => {
            let rendered_fields: Vec<Value> = fields
                .iter()
                .map(|(field_name, field_type)| {
                    json!({
                        "name": field_name,
                        "type": render_node(field_type, survivors, nodes, effective_refs),
                    })
                })
                .collect();

            let mut obj = json!({
                "type": "record",
                "name": short_name(name),
                "fields": rendered_fields,
            });
            if let Some(ns) = namespace {
                obj["namespace"] = Value::String(ns.clone());
            }
            obj
        }
        SchemaNode::Enum {
            name,
            namespace,
            symbols,
        } => {
            let mut obj = json!({
                "type": "enum",
                "name": short_name(name),
                "symbols": symbols,
            });
            if let Some(ns) = namespace {
                obj["namespace"] = Value::String(ns.clone());
            }
            obj
        }
        SchemaNode::Fixed {
            name,
            namespace,
            size,
        } => {
            let mut obj = json!({
                "type": "fixed",
                "name": short_name(name),
                "size": size,
            });
            if let Some(ns) = namespace {
                obj["namespace"] = Value::String(ns.clone());
            }
            obj
        }
    }
}

fn topo_sort(survivors: &BTreeSet<String>, deps: &BTreeMap<String, Vec<String>>, root: &str) -> Vec<String> {
    fn visit(
        name: &str,
        deps: &BTreeMap<String, Vec<String>>,
        visited: &mut BTreeSet<String>,
        visiting: &mut BTreeSet<String>,
        order: &mut Vec<String>,
        cyclic: &mut bool,
    ) {
        if visited.contains(name) {
            return;
        }
        if visiting.contains(name) {
            *cyclic = true;
            return;
        }

        visiting.insert(name.to_string());

        if let Some(d) = deps.get(name) {
            let mut sorted = d.clone();
            sorted.sort();
            for dep in sorted {
                if dep != name {
                    visit(&dep, deps, visited, visiting, order, cyclic);
                }
            }
        }

        visiting.remove(name);
        visited.insert(name.to_string());
        order.push(name.to_string());
    }

    let mut visited = BTreeSet::new();
    let mut visiting = BTreeSet::new();
    let mut order = Vec::new();
    let mut cyclic = false;

    let mut rest: Vec<&String> = survivors.iter().filter(|n| n.as_str() != root).collect();
    rest.sort();
    for name in rest {
        visit(name, deps, &mut visited, &mut visiting, &mut order, &mut cyclic);
    }
    visit(root, deps, &mut visited, &mut visiting, &mut order, &mut cyclic);

    if cyclic {
        let mut fallback: Vec<String> = survivors.iter().cloned().collect();
        fallback.sort_by_key(|n| deps.get(n).map(Vec::len).unwrap_or(0));
        return fallback;
    }

    order
}

fn split_avro(body: &str, config: &SplitConfig) -> Result<SplitResult, ParseError> {
    let WalkResult { nodes, root, .. } = walker::avro::walk(body)?;

    let root = root.ok_or_else(|| ParseError::SchemaBody {
        schema_type: "AVRO",
        message: "schema has no named root type".to_string(),
    })?;

    // Pass 1: render every node in isolation (as if all were extracted) to
    // measure its own size, deciding which survive the min-size filter.
    let all: BTreeSet<String> = nodes.keys().cloned().collect();
    let mut survivors: BTreeSet<String> = BTreeSet::new();
    for name in &all {
        let node = &nodes[name];
        let mut scratch = Vec::new();
        let rendered = render_node(node, &all, &nodes, &mut scratch);
        let size = serde_json::to_string(&rendered).unwrap_or_default().len();
        if name == &root || size >= config.min_extract_size {
            survivors.insert(name.clone());
        }
    }

    // Pass 2: rebuild from the untouched original graph, this time only
    // extracting survivors; everything else is inlined.
    let mut extracted = Vec::new();
    let mut effective_deps: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for name in &survivors {
        let node = &nodes[name];
        let mut refs = Vec::new();
        let rendered = render_node(node, &survivors, &nodes, &mut refs);
        refs.retain(|r| r != name);
        refs.sort();
        refs.dedup();

        let body_text = serde_json::to_string(&rendered).map_err(ParseError::from)?;

        effective_deps.insert(name.clone(), refs);
        extracted.push((name.clone(), body_text));
    }

    let order = topo_sort(&survivors, &effective_deps, &root);
    let position: BTreeMap<&String, usize> = order.iter().enumerate().map(|(i, n)| (n, i)).collect();
    extracted.sort_by_key(|(name, _)| position.get(name).copied().unwrap_or(usize::MAX));

    let types = extracted
        .into_iter()
        .enumerate()
        .map(|(order, (name, body_text))| {
            let size = body_text.len();
            ExtractedType {
                qualified_name: name.clone(),
                subject: subject_for(config, &name),
                body: body_text,
                schema_type: SchemaType::Avro,
                size,
                references: effective_deps.get(&name).cloned().unwrap_or_default(),
                is_root: name == root,
                order,
            }
        })
        .collect();

    Ok(SplitResult { types })
}

// ------------------------------------------------------------ Protobuf ----

fn split_protobuf(body: &str, config: &SplitConfig) -> Result<SplitResult, ParseError> {
    let messages = extract_top_level_messages(body)?;
    let bodies: BTreeMap<String, String> = messages.iter().cloned().collect();
    let names: Vec<String> = messages.iter().map(|(n, _)| n.clone()).collect();

    let mut deps_by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, msg_body) in &messages {
        let mut deps: Vec<String> = names
            .iter()
            .filter(|other| *other != name)
            .filter(|other| {
                msg_body
                    .split(|c: char| !c.is_alphanumeric() && c != '_')
                    .any(|token| token == other.as_str())
            })
            .cloned()
            .collect();
        deps.sort();
        deps.dedup();
        deps_by_name.insert(name.clone(), deps);
    }

    let root = names.first().cloned().ok_or_else(|| ParseError::SchemaBody {
        schema_type: "PROTOBUF",
        message: "no top-level message found".to_string(),
    })?;

    let survivors: BTreeSet<String> = names.iter().cloned().collect();
    let order = topo_sort(&survivors, &deps_by_name, &root);
    let position: BTreeMap<&String, usize> = order.iter().enumerate().map(|(i, n)| (n, i)).collect();

    let mut ordered_names: Vec<String> = names;
    ordered_names.sort_by_key(|n| position.get(n).copied().unwrap_or(usize::MAX));

    let types = ordered_names
        .into_iter()
        .enumerate()
        .map(|(order, name)| {
            let msg_body = bodies.get(&name).cloned().unwrap_or_default();
            let body_text = format!("message {} {{{}}}", name, msg_body);

            ExtractedType {
                qualified_name: name.clone(),
                subject: subject_for(config, &name),
                size: body_text.len(),
                body: body_text,
                schema_type: SchemaType::Protobuf,
                references: deps_by_name.get(&name).cloned().unwrap_or_default(),
                is_root: name == root,
                order,
            }
        })
        .collect();

    Ok(SplitResult { types })
}

// --------------------------------------------------------- JSON Schema ----

fn split_jsonschema(body: &str, config: &SplitConfig) -> Result<SplitResult, ParseError> {
    let WalkResult { graph, nodes, root } = walker::jsonschema::walk(body)?;

    let root = root.ok_or_else(|| ParseError::SchemaBody {
        schema_type: "JSON",
        message: "schema has no root object".to_string(),
    })?;

    let survivors: BTreeSet<String> = nodes.keys().cloned().collect();
    let order = topo_sort(&survivors, &graph, &root);
    let position: BTreeMap<&String, usize> = order.iter().enumerate().map(|(i, n)| (n, i)).collect();

    let mut names: Vec<&String> = nodes.keys().collect();
    names.sort_by_key(|n| position.get(n).copied().unwrap_or(usize::MAX));

    let types = names
        .into_iter()
        .enumerate()
        .map(|(order, name)| {
            let body_text = serde_json::to_string(&json!({
                "title": name,
                "type": "object",
            }))
            .unwrap_or_default();

            ExtractedType {
                qualified_name: name.clone(),
                subject: subject_for(config, name),
                body: body_text.clone(),
                schema_type: SchemaType::Json,
                size: body_text.len(),
                references: graph.get(name).cloned().unwrap_or_default(),
                is_root: name == &root,
                order,
            }
        })
        .collect();

    Ok(SplitResult { types })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avro_split_orders_dependencies_before_dependents() {
        let body = r#"{
            "type": "record",
            "name": "Order",
            "namespace": "com.example",
            "fields": [
                {"name": "id", "type": "string"},
                {"name": "item", "type": {
                    "type": "record",
                    "name": "Item",
                    "namespace": "com.example",
                    "fields": [{"name": "sku", "type": "string"}]
                }}
            ]
        }"#;

        let result = split_avro(body, &SplitConfig::default()).unwrap();
        let positions: BTreeMap<&str, usize> = result
            .types
            .iter()
            .map(|t| (t.qualified_name.as_str(), t.order))
            .collect();

        assert!(positions["com.example.Item"] < positions["com.example.Order"]);
        assert!(result.root().is_some());
        assert_eq!(result.root().unwrap().qualified_name, "com.example.Order");
    }

    #[test]
    fn avro_split_inlines_types_below_min_size() {
        let body = r#"{
            "type": "record",
            "name": "Order",
            "fields": [
                {"name": "item", "type": {
                    "type": "record",
                    "name": "Item",
                    "fields": [{"name": "sku", "type": "string"}]
                }}
            ]
        }"#;

        let result = split_avro(body, &SplitConfig { min_extract_size: 10_000, subject_prefix: String::new() }).unwrap();
        assert_eq!(result.types.len(), 1);
        assert_eq!(result.types[0].qualified_name, "Order");
        assert!(result.types[0].body.contains("\"Item\""));
    }
}
