use crate::error::ParseError;
use crate::walker::{SchemaNode, WalkResult};

const SCHEMA_TYPE: &str = "PROTOBUF";

fn err(message: impl Into<String>) -> ParseError {
    ParseError::SchemaBody {
        schema_type: SCHEMA_TYPE,
        message: message.into(),
    }
}

/// Extracts top-level `message Name { ... }` blocks by brace-depth
/// counting, not regex: a nested `message` inside another message's body is
/// left untouched as part of the parent's text.
pub fn extract_top_level_messages(body: &str) -> Result<Vec<(String, String)>, ParseError> {
    let mut messages = Vec::new();
    let mut search_from = 0usize;

    while let Some(rel) = body[search_from..].find("message ") {
        let keyword_start = search_from + rel;
        let after_keyword = keyword_start + "message ".len();
        let rest = &body[after_keyword..];

        let name_end = rest
            .find(|c: char| c == '{' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = rest[..name_end].trim().to_string();

        if name.is_empty() {
            return Err(err("message keyword with no name"));
        }

        let brace_rel = rest
            .find('{')
            .ok_or_else(|| err(format!("message '{name}' has no body")))?;

        let mut depth = 0i32;
        let mut close_rel = None;
        for (idx, ch) in rest[brace_rel..].char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        close_rel = Some(brace_rel + idx);
                        break;
                    }
                }
                _ => {}
            }
        }

        let close_rel =
            close_rel.ok_or_else(|| err(format!("message '{name}' body never closes")))?;

        let msg_body = rest[brace_rel + 1..close_rel].to_string();
        messages.push((name, msg_body));

        search_from = after_keyword + close_rel + 1;
    }

    Ok(messages)
}

pub fn walk(body: &str) -> Result<WalkResult, ParseError> {
    let messages = extract_top_level_messages(body)?;
    let mut result = WalkResult::default();

    for (name, msg_body) in &messages {
        let mut deps: Vec<String> = messages
            .iter()
            .filter(|(other, _)| other != name)
            .filter(|(other, _)| contains_bare_name(msg_body, other))
            .map(|(other, _)| other.clone())
            .collect();
        deps.sort();
        deps.dedup();

        result.nodes.insert(
            name.clone(),
            SchemaNode::Record {
                name: name.clone(),
                namespace: None,
                fields: Vec::new(),
            },
        );
        result.graph.insert(name.clone(), deps);
    }

    result.root = messages.into_iter().next().map(|(name, _)| name);

    Ok(result)
}

fn contains_bare_name(haystack: &str, name: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .any(|token| token == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_top_level_messages_and_cross_references() {
        let body = r#"
            message Address {
              string city = 1;
            }
            message Order {
              string id = 1;
              Address address = 2;
            }
        "#;

        let result = walk(body).unwrap();
        assert_eq!(result.graph.get("Order").unwrap(), &vec!["Address".to_string()]);
        assert!(result.graph.get("Address").unwrap().is_empty());
    }

    #[test]
    fn nested_message_is_not_extracted_as_top_level() {
        let body = r#"
            message Order {
              message Nested { string x = 1; }
              Nested n = 1;
            }
        "#;

        let result = walk(body).unwrap();
        assert_eq!(result.nodes.len(), 1);
        assert!(result.nodes.contains_key("Order"));
    }
}
