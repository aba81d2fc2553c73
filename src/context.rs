//! Subject-Context Rewriter (spec §4.9).
//!
//! Subjects at the wire level take either the bare form `name` (default
//! context) or the tenant-qualified form `:.ctx:name`. This module parses
//! the incoming form and re-encodes it for a target context.

/// Splits a wire-form subject into `(context, bare_name)`. `context` is the
/// raw qualifier with its leading dot (e.g. `.ctx`), or `None` for the
/// default context.
pub fn parse_subject(wire: &str) -> (Option<&str>, &str) {
    if let Some(rest) = wire.strip_prefix(":.") {
        if let Some(idx) = rest.find(':') {
            let context = &wire[1..idx + 2];
            let name = &rest[idx + 1..];
            return (Some(context), name);
        }
    }

    (None, wire)
}

/// Strips any existing context qualifier, returning the bare subject name.
pub fn bare_name(wire: &str) -> &str {
    parse_subject(wire).1
}

/// Re-encodes `wire`'s bare name under `target_context`. An empty or `"."`
/// target context produces the bare form; any other value is normalized to
/// start with a single leading dot and wrapped as `:.{ctx}:{name}`.
pub fn rewrite_subject(wire: &str, target_context: &str) -> String {
    let (_, name) = parse_subject(wire);

    if target_context.is_empty() || target_context == "." {
        return name.to_string();
    }

    let context = if let Some(stripped) = target_context.strip_prefix('.') {
        stripped
    } else {
        target_context
    };

    format!(":.{}:{}", context, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_subject_has_no_context() {
        assert_eq!(parse_subject("orders-value"), (None, "orders-value"));
    }

    #[test]
    fn qualified_subject_splits_context_and_name() {
        assert_eq!(
            parse_subject(":.tenant-a:orders-value"),
            (Some(".tenant-a"), "orders-value")
        );
    }

    #[test]
    fn rewrite_into_default_context_strips_qualifier() {
        assert_eq!(rewrite_subject(":.tenant-a:orders-value", ""), "orders-value");
        assert_eq!(rewrite_subject(":.tenant-a:orders-value", "."), "orders-value");
    }

    #[test]
    fn rewrite_into_named_context_normalizes_leading_dot() {
        assert_eq!(
            rewrite_subject("orders-value", "tenant-b"),
            ":.tenant-b:orders-value"
        );
        assert_eq!(
            rewrite_subject("orders-value", ".tenant-b"),
            ":.tenant-b:orders-value"
        );
    }

    #[test]
    fn rewrite_is_an_involution_up_to_target_context() {
        let original = ":.tenant-a:orders-value";
        let rewritten = rewrite_subject(original, "tenant-b");
        let back = rewrite_subject(&rewritten, "tenant-a");
        assert_eq!(back, original);
    }
}
