//! Filter descriptor types
//!
//! The WHERE-clause DSL accepts dynamically shaped JSON (scalars, operator
//! maps, ordered sequences, raw fragments). All of that is resolved exactly
//! once, at this boundary, into the tagged unions below; the recursive
//! compiler in `where_clause` only ever sees typed data.

use serde_json::Value;

/// Logical combinator joining sibling predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
    Xor,
}

impl Combinator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
            Combinator::Xor => "XOR",
        }
    }

    /// Case-insensitive parse of AND/OR/XOR.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_uppercase().as_str() {
            "AND" => Some(Combinator::And),
            "OR" => Some(Combinator::Or),
            "XOR" => Some(Combinator::Xor),
            _ => None,
        }
    }
}

/// A filter key naming multiple columns, parsed once from the `a|b` (OR) or
/// `a&b` (AND) shorthand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundKey {
    pub fields: Vec<String>,
    pub combinator: Combinator,
}

/// Reserved `_`-prefixed condition keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialKey {
    /// `_string`: literal SQL passthrough
    String,
    /// `_complex`: nested filter node
    Complex,
    /// `_query`: flat key/value equality map (or `a=1&b=2` string)
    Query,
    /// Anything else; compiles to nothing with a diagnostic
    Unknown(String),
}

impl SpecialKey {
    fn parse(key: &str) -> Self {
        match key {
            "_string" => SpecialKey::String,
            "_complex" => SpecialKey::Complex,
            "_query" => SpecialKey::Query,
            other => SpecialKey::Unknown(other.to_string()),
        }
    }
}

/// A predicate key: one column or a compound shorthand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKey {
    Field(String),
    Compound(CompoundKey),
}

impl FilterKey {
    pub fn parse(key: &str) -> Self {
        let key = key.trim();
        if key.contains('|') {
            FilterKey::Compound(CompoundKey {
                fields: key.split('|').map(str::to_string).collect(),
                combinator: Combinator::Or,
            })
        } else if key.contains('&') {
            FilterKey::Compound(CompoundKey {
                fields: key.split('&').map(str::to_string).collect(),
                combinator: Combinator::And,
            })
        } else {
            FilterKey::Field(key.to_string())
        }
    }

    /// The key as written, for diagnostics.
    pub fn raw(&self) -> String {
        match self {
            FilterKey::Field(name) => name.clone(),
            FilterKey::Compound(compound) => {
                let separator = match compound.combinator {
                    Combinator::Or => "|",
                    _ => "&",
                };
                compound.fields.join(separator)
            }
        }
    }
}

/// The value side of one predicate, resolved from JSON exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Scalar (or null) compiled as an equality test
    Equals(Value),
    /// Per-operator map with its own combinator (default AND)
    OperatorMap {
        entries: Vec<(String, Value)>,
        combinator: Combinator,
    },
    /// Ordered encodings: `[op, operand]`, `[LIKE, [..], logic]`,
    /// `[IN, list-or-csv]`, `[BETWEEN, lo, hi]`, implicit condition lists
    Sequence(Vec<Value>),
    /// `["exp", text]`: raw SQL tested against the key
    RawExpr(String),
}

impl FilterValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let mut combinator = Combinator::And;
                let mut entries = Vec::new();
                for (key, entry) in map {
                    if key == "_logic" {
                        if let Some(parsed) = entry.as_str().and_then(Combinator::parse) {
                            combinator = parsed;
                        }
                    } else {
                        entries.push((key.clone(), entry.clone()));
                    }
                }
                FilterValue::OperatorMap { entries, combinator }
            }
            Value::Array(items) => {
                if let Some(raw) = super::literal::raw_expression(items) {
                    FilterValue::RawExpr(raw)
                } else {
                    FilterValue::Sequence(items.clone())
                }
            }
            scalar => FilterValue::Equals(scalar.clone()),
        }
    }
}

/// One entry of a filter group.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEntry {
    Predicate { key: FilterKey, value: FilterValue },
    Special { key: SpecialKey, value: Value },
}

/// The recursive WHERE-clause description.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// Verbatim SQL escape hatch
    Raw(String),
    /// Ordered predicates joined by a combinator; `multi` pairs compound
    /// sub-keys with positional value elements
    Group {
        entries: Vec<FilterEntry>,
        combinator: Combinator,
        multi: bool,
    },
}

impl Default for FilterNode {
    fn default() -> Self {
        FilterNode::Group {
            entries: Vec::new(),
            combinator: Combinator::And,
            multi: false,
        }
    }
}

impl FilterNode {
    /// Resolve a JSON filter descriptor into the typed form.
    ///
    /// The reserved `_logic` and `_multi` keys are consumed into the node;
    /// the caller's JSON is never mutated.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(text) => FilterNode::Raw(text.clone()),
            Value::Object(map) => {
                let mut combinator = Combinator::And;
                let mut multi = false;
                let mut entries = Vec::new();
                for (key, entry) in map {
                    let key = key.trim();
                    match key {
                        "_logic" => {
                            if let Some(parsed) = entry.as_str().and_then(Combinator::parse) {
                                combinator = parsed;
                            }
                        }
                        "_multi" => multi = is_truthy(entry),
                        _ if key.starts_with('_') => entries.push(FilterEntry::Special {
                            key: SpecialKey::parse(key),
                            value: entry.clone(),
                        }),
                        _ => entries.push(FilterEntry::Predicate {
                            key: FilterKey::parse(key),
                            value: FilterValue::from_json(entry),
                        }),
                    }
                }
                FilterNode::Group {
                    entries,
                    combinator,
                    multi,
                }
            }
            // Anything else has no predicates to offer
            _ => FilterNode::default(),
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        FilterNode::Raw(text.into())
    }

    /// A group holding one predicate.
    pub fn predicate(field: &str, value: FilterValue) -> Self {
        Self::single(field, value)
    }

    fn single(field: &str, value: FilterValue) -> Self {
        FilterNode::Group {
            entries: vec![FilterEntry::Predicate {
                key: FilterKey::parse(field),
                value,
            }],
            combinator: Combinator::And,
            multi: false,
        }
    }

    fn operator(field: &str, operator: &str, value: Value) -> Self {
        Self::single(
            field,
            FilterValue::OperatorMap {
                entries: vec![(operator.to_string(), value)],
                combinator: Combinator::And,
            },
        )
    }

    pub fn eq(field: &str, value: Value) -> Self {
        Self::single(field, FilterValue::Equals(value))
    }

    pub fn ne(field: &str, value: Value) -> Self {
        Self::operator(field, "NEQ", value)
    }

    pub fn gt(field: &str, value: Value) -> Self {
        Self::operator(field, "GT", value)
    }

    pub fn gte(field: &str, value: Value) -> Self {
        Self::operator(field, "EGT", value)
    }

    pub fn lt(field: &str, value: Value) -> Self {
        Self::operator(field, "LT", value)
    }

    pub fn lte(field: &str, value: Value) -> Self {
        Self::operator(field, "ELT", value)
    }

    pub fn like(field: &str, pattern: &str) -> Self {
        Self::operator(field, "LIKE", Value::String(pattern.to_string()))
    }

    pub fn not_like(field: &str, pattern: &str) -> Self {
        Self::operator(field, "NOTLIKE", Value::String(pattern.to_string()))
    }

    pub fn in_values(field: &str, values: Vec<Value>) -> Self {
        Self::operator(field, "IN", Value::Array(values))
    }

    pub fn not_in_values(field: &str, values: Vec<Value>) -> Self {
        Self::operator(field, "NOTIN", Value::Array(values))
    }

    pub fn between(field: &str, low: Value, high: Value) -> Self {
        Self::single(
            field,
            FilterValue::Sequence(vec![Value::String("BETWEEN".to_string()), low, high]),
        )
    }

    /// Raw expression tested against a column: compiles to `(field text)`.
    pub fn exp(field: &str, text: impl Into<String>) -> Self {
        Self::single(field, FilterValue::RawExpr(text.into()))
    }

    /// Nest another node as a `_complex` sub-condition.
    pub fn complex(node: FilterNode) -> Self {
        FilterNode::Group {
            entries: vec![FilterEntry::Special {
                key: SpecialKey::Complex,
                value: node.to_json(),
            }],
            combinator: Combinator::And,
            multi: false,
        }
    }

    /// Override this group's combinator.
    pub fn with_combinator(self, combinator: Combinator) -> Self {
        match self {
            FilterNode::Group {
                entries, multi, ..
            } => FilterNode::Group {
                entries,
                combinator,
                multi,
            },
            raw => raw,
        }
    }

    /// Merge another filter into this one, accumulating predicates the way
    /// successive `where` calls do. Raw fragments become `_string` entries.
    pub fn merge(self, other: FilterNode) -> Self {
        let (mut entries, mut combinator, mut multi) = match self {
            FilterNode::Group {
                entries,
                combinator,
                multi,
            } => (entries, combinator, multi),
            FilterNode::Raw(text) => (
                vec![string_entry(text)],
                Combinator::And,
                false,
            ),
        };
        match other {
            FilterNode::Group {
                entries: more,
                combinator: other_combinator,
                multi: other_multi,
            } => {
                entries.extend(more);
                if other_combinator != Combinator::And {
                    combinator = other_combinator;
                }
                multi = multi || other_multi;
            }
            FilterNode::Raw(text) => entries.push(string_entry(text)),
        }
        FilterNode::Group {
            entries,
            combinator,
            multi,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FilterNode::Raw(text) => text.is_empty(),
            FilterNode::Group { entries, .. } => entries.is_empty(),
        }
    }

    /// Re-encode as JSON (used by `_complex` nesting and descriptor debug).
    pub fn to_json(&self) -> Value {
        match self {
            FilterNode::Raw(text) => Value::String(text.clone()),
            FilterNode::Group {
                entries,
                combinator,
                multi,
            } => {
                let mut map = serde_json::Map::new();
                if *combinator != Combinator::And {
                    map.insert(
                        "_logic".to_string(),
                        Value::String(combinator.to_sql().to_string()),
                    );
                }
                if *multi {
                    map.insert("_multi".to_string(), Value::Bool(true));
                }
                for entry in entries {
                    match entry {
                        FilterEntry::Predicate { key, value } => {
                            map.insert(key.raw(), filter_value_to_json(value));
                        }
                        FilterEntry::Special { key, value } => {
                            let name = match key {
                                SpecialKey::String => "_string".to_string(),
                                SpecialKey::Complex => "_complex".to_string(),
                                SpecialKey::Query => "_query".to_string(),
                                SpecialKey::Unknown(name) => name.clone(),
                            };
                            map.insert(name, value.clone());
                        }
                    }
                }
                Value::Object(map)
            }
        }
    }
}

fn string_entry(text: String) -> FilterEntry {
    FilterEntry::Special {
        key: SpecialKey::String,
        value: Value::String(text),
    }
}

fn filter_value_to_json(value: &FilterValue) -> Value {
    match value {
        FilterValue::Equals(v) => v.clone(),
        FilterValue::OperatorMap { entries, combinator } => {
            let mut map = serde_json::Map::new();
            if *combinator != Combinator::And {
                map.insert(
                    "_logic".to_string(),
                    Value::String(combinator.to_sql().to_string()),
                );
            }
            for (operator, operand) in entries {
                map.insert(operator.clone(), operand.clone());
            }
            Value::Object(map)
        }
        FilterValue::Sequence(items) => Value::Array(items.clone()),
        FilterValue::RawExpr(text) => Value::Array(vec![
            Value::String("exp".to_string()),
            Value::String(text.clone()),
        ]),
    }
}

/// JavaScript-style truthiness, used for the `_multi` flag.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
