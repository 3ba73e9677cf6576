//! Literal and identifier compilation
//!
//! Everything that reaches a statement passes through here exactly once:
//! identifiers are backtick-quoted unless they already look like raw SQL,
//! and values are classified into escaped string literals, numeric/boolean
//! tokens, `null`, raw expressions or element lists.

use serde_json::Value;

/// Quote an identifier for safe use in a statement.
///
/// Identifiers that contain characters typical of a pre-formed SQL fragment
/// (comma, quote, parenthesis, backtick, dot, `*` or whitespace) are passed
/// through verbatim; the caller is asserting they are already valid SQL.
pub fn quote_identifier(name: &str) -> String {
    let name = name.trim();
    if name.chars().any(is_raw_sql_char) {
        name.to_string()
    } else {
        format!("`{}`", name)
    }
}

fn is_raw_sql_char(c: char) -> bool {
    matches!(c, ',' | '\'' | '"' | '*' | '(' | ')' | '`' | '.') || c.is_whitespace()
}

/// Escape a string for embedding in a single-quoted SQL literal.
///
/// Covers NUL, newline, carriage return, backspace, tab, Ctrl-Z, backslash
/// and both quote characters. Empty input yields an empty string.
pub fn escape_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\u{0008}' => escaped.push_str("\\b"),
            '\t' => escaped.push_str("\\t"),
            '\u{001a}' => escaped.push_str("\\Z"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Result of compiling one value: a single SQL token, or one token per
/// element for list-shaped values (consumed by IN-list builders).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledValue {
    One(String),
    Many(Vec<String>),
}

impl CompiledValue {
    /// The scalar token, if this compiled to a single one.
    pub fn scalar(self) -> Option<String> {
        match self {
            CompiledValue::One(token) => Some(token),
            CompiledValue::Many(_) => None,
        }
    }
}

/// Compile a JSON value into SQL literal text.
///
/// Strings are escaped and quoted, booleans become `1`/`0`, null becomes the
/// bare `null` token and numbers are emitted as-is. An array tagged
/// `["exp", text]` is a raw expression: the text is emitted verbatim and is
/// the caller's responsibility. Any other array compiles element-wise.
pub fn compile_value(value: &Value) -> CompiledValue {
    match value {
        Value::String(text) => CompiledValue::One(format!("'{}'", escape_string(text))),
        Value::Bool(flag) => CompiledValue::One((if *flag { "1" } else { "0" }).to_string()),
        Value::Null => CompiledValue::One("null".to_string()),
        Value::Number(number) => CompiledValue::One(number.to_string()),
        Value::Array(items) => {
            if let Some(raw) = raw_expression(items) {
                CompiledValue::One(raw)
            } else {
                CompiledValue::Many(items.iter().map(compile_scalar).collect())
            }
        }
        // A bare object has no literal form; serialize and escape it so the
        // never-unescaped invariant holds.
        Value::Object(_) => CompiledValue::One(format!("'{}'", escape_string(&value.to_string()))),
    }
}

/// Compile a value down to a single token, joining list elements with commas.
pub fn compile_scalar(value: &Value) -> String {
    match compile_value(value) {
        CompiledValue::One(token) => token,
        CompiledValue::Many(tokens) => tokens.join(","),
    }
}

/// Detect the `["exp", text]` raw-expression form, case-insensitively.
pub(crate) fn raw_expression(items: &[Value]) -> Option<String> {
    let tag = items.first()?.as_str()?;
    if tag.eq_ignore_ascii_case("exp") {
        Some(render_raw(items.get(1).unwrap_or(&Value::Null)))
    } else {
        None
    }
}

/// Render a JSON value as raw SQL text (used by exp escapes).
pub(crate) fn render_raw(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_identifier_plain() {
        assert_eq!(quote_identifier("name"), "`name`");
        assert_eq!(quote_identifier(" name "), "`name`");
        assert_eq!(quote_identifier("user_id"), "`user_id`");
    }

    #[test]
    fn test_quote_identifier_raw_fragments() {
        assert_eq!(quote_identifier("u.id"), "u.id");
        assert_eq!(quote_identifier("*"), "*");
        assert_eq!(quote_identifier("count(id)"), "count(id)");
        assert_eq!(quote_identifier("`already`"), "`already`");
        assert_eq!(quote_identifier("a, b"), "a, b");
        assert_eq!(quote_identifier("name AS n"), "name AS n");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string(""), "");
        assert_eq!(escape_string("it's"), "it\\'s");
        assert_eq!(escape_string("a\nb\tc"), "a\\nb\\tc");
        assert_eq!(escape_string("back\\slash"), "back\\\\slash");
        assert_eq!(escape_string("\0\r\u{0008}\u{001a}\""), "\\0\\r\\b\\Z\\\"");
    }

    #[test]
    fn test_compile_value_scalars() {
        assert_eq!(
            compile_value(&json!("it's")),
            CompiledValue::One("'it\\'s'".to_string())
        );
        assert_eq!(compile_value(&json!(true)), CompiledValue::One("1".to_string()));
        assert_eq!(compile_value(&json!(false)), CompiledValue::One("0".to_string()));
        assert_eq!(compile_value(&Value::Null), CompiledValue::One("null".to_string()));
        assert_eq!(compile_value(&json!(42)), CompiledValue::One("42".to_string()));
        assert_eq!(compile_value(&json!(1.5)), CompiledValue::One("1.5".to_string()));
    }

    #[test]
    fn test_compile_value_raw_expression() {
        assert_eq!(
            compile_value(&json!(["exp", "NOW()"])),
            CompiledValue::One("NOW()".to_string())
        );
        // Tag match is case-insensitive
        assert_eq!(
            compile_value(&json!(["EXP", "count+1"])),
            CompiledValue::One("count+1".to_string())
        );
    }

    #[test]
    fn test_compile_value_list() {
        assert_eq!(
            compile_value(&json!([1, "a", true])),
            CompiledValue::Many(vec!["1".to_string(), "'a'".to_string(), "1".to_string()])
        );
    }

    #[test]
    fn test_compile_value_object_is_escaped() {
        let compiled = compile_scalar(&json!({"a": "x'y"}));
        assert!(compiled.starts_with('\''));
        assert!(compiled.contains("\\'"));
    }
}
