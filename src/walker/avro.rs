use serde_json::Value;

use crate::error::ParseError;
use crate::walker::{collect_named, SchemaNode, WalkResult};

const SCHEMA_TYPE: &str = "AVRO";

const PRIMITIVES: &[&str] = &[
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

fn resolve_name(name: &str, namespace: Option<&str>) -> String {
    if name.contains('.') {
        name.to_string()
    } else if let Some(ns) = namespace {
        format!("{}.{}", ns, name)
    } else {
        name.to_string()
    }
}

fn err(message: impl Into<String>) -> ParseError {
    ParseError::SchemaBody {
        schema_type: SCHEMA_TYPE,
        message: message.into(),
    }
}

fn str_field<'a>(map: &'a serde_json::Map<String, Value>, field: &str) -> Result<&'a str, ParseError> {
    map.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| err(format!("missing or non-string '{field}'")))
}

fn visit(value: &Value, namespace: Option<&str>, result: &mut WalkResult) -> Result<SchemaNode, ParseError> {
    match value {
        Value::String(s) => {
            if PRIMITIVES.contains(&s.as_str()) {
                Ok(SchemaNode::Primitive(s.clone()))
            } else {
                Ok(SchemaNode::Named(resolve_name(s, namespace)))
            }
        }
        Value::Array(items) => {
            let nodes = items
                .iter()
                .map(|v| visit(v, namespace, result))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SchemaNode::Union(nodes))
        }
        Value::Object(map) => {
            let type_value = map.get("type").ok_or_else(|| err("missing 'type'"))?;

            match type_value.as_str() {
                Some("record") => visit_record(map, namespace, result),
                Some("enum") => visit_enum(map, namespace, result),
                Some("fixed") => visit_fixed(map, namespace, result),
                Some("array") => {
                    let items = map.get("items").ok_or_else(|| err("array missing 'items'"))?;
                    Ok(SchemaNode::Array(Box::new(visit(items, namespace, result)?)))
                }
                Some("map") => {
                    let values = map.get("values").ok_or_else(|| err("map missing 'values'"))?;
                    Ok(SchemaNode::Map(Box::new(visit(values, namespace, result)?)))
                }
                Some(prim) if PRIMITIVES.contains(&prim) => Ok(SchemaNode::Primitive(prim.to_string())),
                _ => visit(type_value, namespace, result),
            }
        }
        _ => Err(err("unexpected schema node shape")),
    }
}

fn visit_record(
    map: &serde_json::Map<String, Value>,
    enclosing_namespace: Option<&str>,
    result: &mut WalkResult,
) -> Result<SchemaNode, ParseError> {
    let name = str_field(map, "name")?;
    let namespace = map
        .get("namespace")
        .and_then(Value::as_str)
        .or(enclosing_namespace);
    let qualified = resolve_name(name, namespace);

    let fields_value = map
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| err(format!("record '{qualified}' missing 'fields'")))?;

    let mut fields = Vec::with_capacity(fields_value.len());
    for field in fields_value {
        let field_map = field
            .as_object()
            .ok_or_else(|| err(format!("record '{qualified}' has a malformed field")))?;
        let field_name = str_field(field_map, "name")?;
        let field_type = field_map
            .get("type")
            .ok_or_else(|| err(format!("field '{field_name}' missing 'type'")))?;
        let field_node = visit(field_type, namespace, result)?;
        fields.push((field_name.to_string(), field_node));
    }

    let deps: Vec<String> = fields
        .iter()
        .flat_map(|(_, node)| collect_named(node))
        .filter(|dep| dep != &qualified)
        .collect();

    let node = SchemaNode::Record {
        name: qualified.clone(),
        namespace: namespace.map(str::to_string),
        fields,
    };

    result.nodes.insert(qualified.clone(), node);
    result.graph.insert(qualified.clone(), dedup(deps));

    Ok(SchemaNode::Named(qualified))
}

fn visit_enum(
    map: &serde_json::Map<String, Value>,
    enclosing_namespace: Option<&str>,
    result: &mut WalkResult,
) -> Result<SchemaNode, ParseError> {
    let name = str_field(map, "name")?;
    let namespace = map
        .get("namespace")
        .and_then(Value::as_str)
        .or(enclosing_namespace);
    let qualified = resolve_name(name, namespace);

    let symbols = map
        .get("symbols")
        .and_then(Value::as_array)
        .ok_or_else(|| err(format!("enum '{qualified}' missing 'symbols'")))?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    let node = SchemaNode::Enum {
        name: qualified.clone(),
        namespace: namespace.map(str::to_string),
        symbols,
    };

    result.nodes.insert(qualified.clone(), node);
    result.graph.insert(qualified.clone(), Vec::new());

    Ok(SchemaNode::Named(qualified))
}

fn visit_fixed(
    map: &serde_json::Map<String, Value>,
    enclosing_namespace: Option<&str>,
    result: &mut WalkResult,
) -> Result<SchemaNode, ParseError> {
    let name = str_field(map, "name")?;
    let namespace = map
        .get("namespace")
        .and_then(Value::as_str)
        .or(enclosing_namespace);
    let qualified = resolve_name(name, namespace);

    let size = map
        .get("size")
        .and_then(Value::as_u64)
        .ok_or_else(|| err(format!("fixed '{qualified}' missing 'size'")))? as usize;

    let node = SchemaNode::Fixed {
        name: qualified.clone(),
        namespace: namespace.map(str::to_string),
        size,
    };

    result.nodes.insert(qualified.clone(), node);
    result.graph.insert(qualified.clone(), Vec::new());

    Ok(SchemaNode::Named(qualified))
}

fn dedup(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names.dedup();
    names
}

pub fn walk(body: &str) -> Result<WalkResult, ParseError> {
    let value: Value = serde_json::from_str(body)?;
    let mut result = WalkResult::default();
    let root = visit(&value, None, &mut result)?;

    if let SchemaNode::Named(name) = root {
        result.root = Some(name);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_nested_record_with_named_reference() {
        let body = r#"{
            "type": "record",
            "name": "Order",
            "namespace": "com.example",
            "fields": [
                {"name": "id", "type": "string"},
                {"name": "item", "type": "com.example.Item"}
            ]
        }"#;

        let result = walk(body).unwrap();
        assert_eq!(result.root.as_deref(), Some("com.example.Order"));
        assert_eq!(
            result.graph.get("com.example.Order").unwrap(),
            &vec!["com.example.Item".to_string()]
        );
    }

    #[test]
    fn inline_nested_record_is_collected_as_its_own_node() {
        let body = r#"{
            "type": "record",
            "name": "Order",
            "fields": [
                {"name": "address", "type": {
                    "type": "record",
                    "name": "Address",
                    "fields": [{"name": "city", "type": "string"}]
                }}
            ]
        }"#;

        let result = walk(body).unwrap();
        assert!(result.nodes.contains_key("Address"));
        assert_eq!(result.graph.get("Order").unwrap(), &vec!["Address".to_string()]);
    }
}
