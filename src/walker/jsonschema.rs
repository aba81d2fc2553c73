use serde_json::Value;

use crate::error::ParseError;
use crate::walker::{SchemaNode, WalkResult};

const SCHEMA_TYPE: &str = "JSON";

fn err(message: impl Into<String>) -> ParseError {
    ParseError::SchemaBody {
        schema_type: SCHEMA_TYPE,
        message: message.into(),
    }
}

fn ref_target(pointer: &str) -> String {
    pointer.rsplit('/').next().unwrap_or(pointer).to_string()
}

fn is_extractable_object(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("object") && value.get("properties").is_some()
}

fn visit_object(name: &str, value: &Value, result: &mut WalkResult) -> Result<(), ParseError> {
    let properties = value
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| err(format!("'{name}' has no 'properties'")))?;

    let mut deps = Vec::new();
    let mut fields = Vec::with_capacity(properties.len());

    for (field_name, field_schema) in properties {
        if let Some(pointer) = field_schema.get("$ref").and_then(Value::as_str) {
            let target = ref_target(pointer);
            deps.push(target.clone());
            fields.push((field_name.clone(), SchemaNode::Named(target)));
        } else if is_extractable_object(field_schema) {
            let nested_name = format!("{}.{}", name, field_name);
            visit_object(&nested_name, field_schema, result)?;
            deps.push(nested_name.clone());
            fields.push((field_name.clone(), SchemaNode::Named(nested_name)));
        } else {
            let primitive = field_schema
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("any")
                .to_string();
            fields.push((field_name.clone(), SchemaNode::Primitive(primitive)));
        }
    }

    deps.sort();
    deps.dedup();

    result.nodes.insert(
        name.to_string(),
        SchemaNode::Record {
            name: name.to_string(),
            namespace: None,
            fields,
        },
    );
    result.graph.insert(name.to_string(), deps);

    Ok(())
}

pub fn walk(body: &str) -> Result<WalkResult, ParseError> {
    let value: Value = serde_json::from_str(body)?;

    if !is_extractable_object(&value) {
        return Err(err("root schema is not an object with 'properties'"));
    }

    let root_name = value
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("root")
        .to_string();

    let mut result = WalkResult::default();
    visit_object(&root_name, &value, &mut result)?;
    result.root = Some(root_name);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_is_an_explicit_dependency() {
        let body = r#"{
            "title": "Order",
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "address": {"$ref": "#/definitions/Address"}
            }
        }"#;

        let result = walk(body).unwrap();
        assert_eq!(result.graph.get("Order").unwrap(), &vec!["Address".to_string()]);
    }

    #[test]
    fn nested_object_is_extracted_as_its_own_node() {
        let body = r#"{
            "title": "Order",
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "properties": { "city": {"type": "string"} }
                }
            }
        }"#;

        let result = walk(body).unwrap();
        assert!(result.nodes.contains_key("Order.address"));
    }
}
