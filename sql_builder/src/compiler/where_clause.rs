//! WHERE-expression compilation
//!
//! Turns a [`FilterNode`] into a SQL boolean expression (without the leading
//! `WHERE` keyword). Unsafe keys and unrecognized operator encodings degrade
//! to empty fragments with a diagnostic; only structural problems and
//! unknown columns (when schema metadata is present) fail the compile.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::diagnostics::{record, Diagnostic};
use crate::errors::{CompileError, CompileResult};

use super::filter::{
    Combinator, CompoundKey, FilterEntry, FilterKey, FilterNode, FilterValue, SpecialKey,
};
use super::literal::{compile_scalar, compile_value, quote_identifier, render_raw, CompiledValue};

/// Identifier-safety pattern for filter keys. Defense in depth: quoting is
/// still the primary escaping mechanism, a failing key is dropped rather
/// than aborting the statement.
static SAFE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w|&\-.(),]+$").expect("safe-key pattern"));

/// Compile a filter node into a boolean expression.
///
/// `known_fields`, when present, is the target table's column set; a plain
/// filter key outside it is a hard error. Degradations are pushed to
/// `warnings`.
pub fn compile_where(
    node: &FilterNode,
    known_fields: Option<&[String]>,
    warnings: &mut Vec<Diagnostic>,
) -> CompileResult<String> {
    match node {
        FilterNode::Raw(text) => Ok(text.clone()),
        FilterNode::Group {
            entries,
            combinator,
            multi,
        } => {
            let mut parts = Vec::new();
            for entry in entries {
                match entry {
                    FilterEntry::Special { key, value } => {
                        let fragment = compile_special(key, value, warnings)?;
                        if !fragment.is_empty() {
                            parts.push(format!("({})", fragment));
                        }
                    }
                    FilterEntry::Predicate { key, value } => {
                        if let Some(fields) = known_fields {
                            check_known_field(key, fields)?;
                        }
                        if !SAFE_KEY.is_match(&key.raw()) {
                            record(warnings, Diagnostic::UnsafeKey { key: key.raw() });
                            continue;
                        }
                        let fragment = match key {
                            FilterKey::Field(name) => {
                                compile_predicate(&quote_identifier(name), value, warnings)
                            }
                            FilterKey::Compound(compound) => {
                                compile_compound(compound, value, *multi, warnings)
                            }
                        };
                        if !fragment.is_empty() {
                            parts.push(format!("({})", fragment));
                        }
                    }
                }
            }
            Ok(parts.join(&format!(" {} ", combinator.to_sql())))
        }
    }
}

/// Hard check against schema metadata. Keys already qualified with `.` and
/// compound shorthands are exempt, mirroring the lenient key classes.
fn check_known_field(key: &FilterKey, fields: &[String]) -> CompileResult<()> {
    if let FilterKey::Field(name) = key {
        if !name.contains('.') && !fields.iter().any(|field| field == name) {
            return Err(CompileError::InvalidField {
                field: name.clone(),
            });
        }
    }
    Ok(())
}

/// Compound key: the same value (or the matching positional element when
/// `multi` is set) tested against every sub-key.
fn compile_compound(
    compound: &CompoundKey,
    value: &FilterValue,
    multi: bool,
    warnings: &mut Vec<Diagnostic>,
) -> String {
    let positional: Option<&[Value]> = match (multi, value) {
        (true, FilterValue::Sequence(items)) => Some(items.as_slice()),
        _ => None,
    };
    let parts: Vec<String> = compound
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let element = positional
                .and_then(|items| items.get(index))
                .map(FilterValue::from_json);
            let effective = element.as_ref().unwrap_or(value);
            format!(
                "({})",
                compile_predicate(&quote_identifier(field), effective, warnings)
            )
        })
        .collect();
    parts.join(&format!(" {} ", compound.combinator.to_sql()))
}

/// Compile one key/value predicate; `key` is already quoted.
fn compile_predicate(key: &str, value: &FilterValue, warnings: &mut Vec<Diagnostic>) -> String {
    match value {
        FilterValue::Equals(scalar) => format!("{} = {}", key, compile_scalar(scalar)),
        FilterValue::RawExpr(text) => format!("({} {})", key, text),
        FilterValue::OperatorMap { entries, combinator } => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(operator, operand)| {
                    let operator = normalize_operator(operator);
                    format!("{} {} {}", key, operator, compile_operand(operand))
                })
                .collect();
            parts.join(&format!(" {} ", combinator.to_sql()))
        }
        FilterValue::Sequence(items) => compile_sequence(key, items, warnings),
    }
}

/// Operand rendering for operator maps: list values become a parenthesized
/// comma list (IN-style), scalars compile directly.
fn compile_operand(operand: &Value) -> String {
    match compile_value(operand) {
        CompiledValue::One(token) => token,
        CompiledValue::Many(tokens) => format!("({})", tokens.join(",")),
    }
}

/// Ordered-sequence predicate forms.
fn compile_sequence(key: &str, items: &[Value], warnings: &mut Vec<Diagnostic>) -> String {
    let Some(first) = items.first() else {
        record(
            warnings,
            Diagnostic::MalformedPredicate {
                key: key.to_string(),
                detail: "empty condition sequence".to_string(),
            },
        );
        return String::new();
    };

    if let Some(token) = first.as_str() {
        let null = Value::Null;
        let operator = normalize_operator(token);
        let operand = items.get(1).unwrap_or(&null);
        match operator.as_str() {
            "=" | "!=" | ">" | ">=" | "<" | "<=" => {
                format!("{} {} {}", key, operator, compile_scalar(operand))
            }
            "LIKE" | "NOT LIKE" => compile_like(key, &operator, operand, items.get(2), warnings),
            "EXP" => format!("({} {})", key, render_raw(operand)),
            "IN" | "NOT IN" => compile_in(key, &operator, operand, items.get(2)),
            "BETWEEN" => compile_between(key, operand, items.get(2)),
            other => {
                record(
                    warnings,
                    Diagnostic::MalformedPredicate {
                        key: key.to_string(),
                        detail: format!("unrecognized operator `{}`", other),
                    },
                );
                String::new()
            }
        }
    } else {
        compile_condition_list(key, items)
    }
}

/// LIKE / NOT LIKE, with the multi-pattern form
/// `[LIKE, [patterns...], logic]` (logic defaults to OR).
fn compile_like(
    key: &str,
    operator: &str,
    operand: &Value,
    logic: Option<&Value>,
    warnings: &mut Vec<Diagnostic>,
) -> String {
    match operand {
        Value::Array(patterns) => {
            let combinator = match logic {
                None => Combinator::Or,
                Some(token) => match token.as_str().and_then(Combinator::parse) {
                    Some(parsed) => parsed,
                    None => {
                        record(
                            warnings,
                            Diagnostic::MalformedPredicate {
                                key: key.to_string(),
                                detail: format!("invalid multi-like logic `{}`", token),
                            },
                        );
                        return String::new();
                    }
                },
            };
            let parts: Vec<String> = patterns
                .iter()
                .map(|pattern| format!("{} {} {}", key, operator, compile_scalar(pattern)))
                .collect();
            format!("({})", parts.join(&format!(" {} ", combinator.to_sql())))
        }
        single => format!("{} {} {}", key, operator, compile_scalar(single)),
    }
}

/// IN / NOT IN. The third sequence slot `exp` passes the operand through
/// verbatim; otherwise the operand is coerced to a list (splitting a
/// comma-joined string), and a single-element list collapses to `=` / `!=`.
fn compile_in(key: &str, operator: &str, operand: &Value, third: Option<&Value>) -> String {
    if third.and_then(Value::as_str) == Some("exp") {
        return format!("{} {} {}", key, operator, render_raw(operand));
    }
    let elements: Vec<String> = match operand {
        Value::String(csv) => csv.split(',').map(csv_literal).collect(),
        Value::Array(items) => items.iter().map(compile_scalar).collect(),
        other => vec![compile_scalar(other)],
    };
    if elements.len() == 1 {
        let collapsed = if operator == "IN" { "=" } else { "!=" };
        format!("{} {} {}", key, collapsed, elements[0])
    } else {
        format!("{} {} ({})", key, operator, elements.join(","))
    }
}

/// BETWEEN bounds come from a comma-joined string, a two-element list, or
/// the second and third sequence slots.
fn compile_between(key: &str, operand: &Value, third: Option<&Value>) -> String {
    let null = Value::Null;
    let (low, high) = match operand {
        Value::String(text) => match text.split_once(',') {
            Some((low, high)) => {
                return format!(
                    "({} BETWEEN {} AND {})",
                    key,
                    csv_literal(low),
                    csv_literal(high)
                );
            }
            // No comma: the second bound comes from the third sequence slot
            None => (operand.clone(), third.unwrap_or(&null).clone()),
        },
        Value::Array(items) => (
            items.first().unwrap_or(&null).clone(),
            items.get(1).unwrap_or(&null).clone(),
        ),
        single => (single.clone(), third.unwrap_or(&null).clone()),
    };
    format!(
        "({} BETWEEN {} AND {})",
        key,
        compile_scalar(&low),
        compile_scalar(&high)
    )
}

/// Implicit condition list: each element is `[op, operand]` or a bare
/// operand implying `=`; a trailing AND/OR/XOR token overrides the default
/// combinator and is excluded from the operands.
fn compile_condition_list(key: &str, items: &[Value]) -> String {
    let mut rule = Combinator::And;
    let mut operands = items;
    if let Some(last) = items.last().and_then(Value::as_str) {
        if let Some(parsed) = Combinator::parse(last) {
            rule = parsed;
            operands = &items[..items.len() - 1];
        }
    }
    let parts: Vec<String> = operands
        .iter()
        .map(|item| match item {
            Value::Array(pair) => {
                let null = Value::Null;
                let operand = pair.get(1).unwrap_or(&null);
                match pair.first().and_then(Value::as_str) {
                    Some(token) if token.eq_ignore_ascii_case("exp") => {
                        format!("({} {})", key, render_raw(operand))
                    }
                    Some(token) => {
                        format!("({} {} {})", key, normalize_operator(token), compile_scalar(operand))
                    }
                    // No operator token: the pair itself is the operand
                    None => format!("({} = {})", key, compile_scalar(item)),
                }
            }
            bare => format!("({} = {})", key, compile_scalar(bare)),
        })
        .collect();
    parts.join(&format!(" {} ", rule.to_sql()))
}

/// `_`-prefixed special condition keys.
fn compile_special(
    key: &SpecialKey,
    value: &Value,
    warnings: &mut Vec<Diagnostic>,
) -> CompileResult<String> {
    match key {
        SpecialKey::String => Ok(value.as_str().map(str::to_string).unwrap_or_default()),
        // Nested nodes are compiled without schema checking, matching the
        // top-level-only validation scope.
        SpecialKey::Complex => compile_where(&FilterNode::from_json(value), None, warnings),
        SpecialKey::Query => Ok(compile_query(value)),
        SpecialKey::Unknown(name) => {
            record(
                warnings,
                Diagnostic::UnknownSpecialKey { key: name.clone() },
            );
            Ok(String::new())
        }
    }
}

/// `_query`: flat equality map, or an `a=1&b=2` string.
fn compile_query(value: &Value) -> String {
    let mut combinator = Combinator::And;
    let mut pairs: Vec<(String, Value)> = Vec::new();
    match value {
        Value::Object(map) => {
            for (key, entry) in map {
                if key == "_logic" {
                    if let Some(parsed) = entry.as_str().and_then(Combinator::parse) {
                        combinator = parsed;
                    }
                } else {
                    pairs.push((key.clone(), entry.clone()));
                }
            }
        }
        Value::String(query) => {
            for piece in query.split('&').filter(|piece| !piece.is_empty()) {
                let mut split = piece.splitn(2, '=');
                let name = split.next().unwrap_or_default().to_string();
                let val = split.next().unwrap_or_default().to_string();
                if name == "_logic" {
                    if let Some(parsed) = Combinator::parse(&val) {
                        combinator = parsed;
                    }
                } else {
                    pairs.push((name, Value::String(val)));
                }
            }
        }
        _ => {}
    }
    let parts: Vec<String> = pairs
        .iter()
        .map(|(name, val)| format!("{} = {}", quote_identifier(name), compile_scalar(val)))
        .collect();
    parts.join(&format!(" {} ", combinator.to_sql()))
}

/// Normalize a comparison mnemonic: known aliases map to their SQL operator,
/// unknown names pass through uppercased.
fn normalize_operator(token: &str) -> String {
    let upper = token.trim().to_uppercase();
    match upper.as_str() {
        "EQ" => "=",
        "NEQ" | "<>" => "!=",
        "GT" => ">",
        "EGT" => ">=",
        "LT" => "<",
        "ELT" => "<=",
        "NOTLIKE" => "NOT LIKE",
        "NOTIN" => "NOT IN",
        _ => return upper,
    }
    .to_string()
}

/// A csv element: plain decimal pieces stay numeric, everything else is an
/// escaped string literal.
fn csv_literal(piece: &str) -> String {
    let piece = piece.trim();
    if piece.parse::<i64>().is_ok() || piece.parse::<f64>().is_ok() {
        piece.to_string()
    } else {
        compile_scalar(&Value::String(piece.to_string()))
    }
}
