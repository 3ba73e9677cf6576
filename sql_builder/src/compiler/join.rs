//! JOIN clause compilation

use serde_json::Value;

use super::literal::quote_identifier;

/// Join flavor; LEFT is the default throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Left,
    Right,
    Inner,
}

impl JoinKind {
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Inner => "INNER JOIN",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "left" => Some(JoinKind::Left),
            "right" => Some(JoinKind::Right),
            "inner" => Some(JoinKind::Inner),
            _ => None,
        }
    }
}

/// ON condition: multiple equality pairs (AND-joined) or a single
/// left/right column pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOn {
    Pairs(Vec<(String, String)>),
    Columns(String, String),
}

impl JoinOn {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(JoinOn::Pairs(
                map.iter()
                    .filter_map(|(left, right)| {
                        right.as_str().map(|right| (left.clone(), right.to_string()))
                    })
                    .collect(),
            )),
            Value::Array(items) => {
                let left = items.first()?.as_str()?;
                let right = items.get(1)?.as_str()?;
                Some(JoinOn::Columns(left.to_string(), right.to_string()))
            }
            Value::String(pair) => {
                let mut pieces = pair.split(',').map(str::trim);
                let left = pieces.next()?;
                let right = pieces.next()?;
                Some(JoinOn::Columns(left.to_string(), right.to_string()))
            }
            _ => None,
        }
    }
}

/// One join: a raw SQL fragment or a structured table join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinSpec {
    /// Appended verbatim; prefixed with LEFT JOIN unless the text already
    /// contains a join keyword
    Raw(String),
    Table {
        table: String,
        kind: JoinKind,
        alias: Option<String>,
        on: Option<JoinOn>,
    },
}

impl JoinSpec {
    pub fn table(table: impl Into<String>) -> Self {
        JoinSpec::Table {
            table: table.into(),
            kind: JoinKind::Left,
            alias: None,
            on: None,
        }
    }

    pub fn kind(mut self, join_kind: JoinKind) -> Self {
        if let JoinSpec::Table { kind, .. } = &mut self {
            *kind = join_kind;
        }
        self
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        if let JoinSpec::Table { alias, .. } = &mut self {
            *alias = Some(name.into());
        }
        self
    }

    pub fn on_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        if let JoinSpec::Table { on, .. } = &mut self {
            *on = Some(JoinOn::Pairs(pairs));
        }
        self
    }

    pub fn on_columns(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        if let JoinSpec::Table { on, .. } = &mut self {
            *on = Some(JoinOn::Columns(left.into(), right.into()));
        }
        self
    }

    /// Resolve JSON join descriptors. Accepts a raw string, a spec map, the
    /// keyed `{table: {join, as, on}}` shorthand, or an array of any of
    /// those.
    pub fn from_json(value: &Value) -> Vec<JoinSpec> {
        match value {
            Value::String(text) => vec![JoinSpec::Raw(text.clone())],
            Value::Array(items) => items.iter().flat_map(JoinSpec::from_json).collect(),
            Value::Object(map) => {
                if map.contains_key("table") || map.contains_key("on") {
                    JoinSpec::from_map(None, map).into_iter().collect()
                } else {
                    map.iter()
                        .filter_map(|(table, spec)| match spec {
                            Value::Object(fields) => JoinSpec::from_map(Some(table), fields),
                            _ => None,
                        })
                        .collect()
                }
            }
            _ => Vec::new(),
        }
    }

    fn from_map(table: Option<&str>, map: &serde_json::Map<String, Value>) -> Option<JoinSpec> {
        let table = table
            .map(str::to_string)
            .or_else(|| map.get("table").and_then(Value::as_str).map(str::to_string))?;
        let kind = map
            .get("join")
            .and_then(Value::as_str)
            .and_then(JoinKind::parse)
            .unwrap_or_default();
        let alias = map.get("as").and_then(Value::as_str).map(str::to_string);
        let on = map.get("on").and_then(JoinOn::from_json);
        Some(JoinSpec::Table {
            table,
            kind,
            alias,
            on,
        })
    }
}

/// Compile the JOIN clauses of a statement, with a leading space when any
/// joins are present.
pub(crate) fn compile_joins(
    joins: &[JoinSpec],
    main_table: &str,
    main_alias: Option<&str>,
    table_prefix: &str,
) -> String {
    let mut clause = String::new();
    for join in joins {
        match join {
            JoinSpec::Raw(text) => {
                if text.to_lowercase().contains(" join ") {
                    clause.push(' ');
                    clause.push_str(text);
                } else {
                    clause.push_str(" LEFT JOIN ");
                    clause.push_str(text);
                }
            }
            JoinSpec::Table {
                table,
                kind,
                alias,
                on,
            } => {
                let table = table.trim();
                // A table token with whitespace is a pre-formed fragment
                // (typically a subquery); it is neither prefixed nor quoted.
                let joined_table = if table.chars().any(char::is_whitespace) {
                    if table.starts_with('(') {
                        table.to_string()
                    } else {
                        format!("({})", table)
                    }
                } else {
                    format!("`{}{}`", table_prefix, table)
                };
                clause.push(' ');
                clause.push_str(kind.to_sql());
                clause.push(' ');
                clause.push_str(&joined_table);
                if let Some(alias) = alias {
                    clause.push_str(" AS ");
                    clause.push_str(alias);
                }
                if let Some(on) = on {
                    let main_side = main_alias.unwrap_or(main_table);
                    let join_side = alias
                        .as_deref()
                        .map(str::to_string)
                        .unwrap_or_else(|| joined_table.trim_matches('`').to_string());
                    match on {
                        JoinOn::Pairs(pairs) => {
                            let conditions: Vec<String> = pairs
                                .iter()
                                .map(|(left, right)| {
                                    format!(
                                        "{}={}",
                                        qualify(left, main_side),
                                        qualify(right, &join_side)
                                    )
                                })
                                .collect();
                            clause.push_str(" ON (");
                            clause.push_str(&conditions.join(" AND "));
                            clause.push(')');
                        }
                        JoinOn::Columns(left, right) => {
                            clause.push_str(" ON ");
                            clause.push_str(&qualify(left, main_side));
                            clause.push('=');
                            clause.push_str(&qualify(right, &join_side));
                        }
                    }
                }
            }
        }
    }
    clause
}

/// Qualify a column with its owning side unless it is already qualified.
fn qualify(column: &str, side: &str) -> String {
    if column.contains('.') {
        column.to_string()
    } else {
        format!("{}.{}", side, quote_identifier(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_kind_to_sql() {
        assert_eq!(JoinKind::Left.to_sql(), "LEFT JOIN");
        assert_eq!(JoinKind::Right.to_sql(), "RIGHT JOIN");
        assert_eq!(JoinKind::Inner.to_sql(), "INNER JOIN");
    }

    #[test]
    fn test_compile_join_with_alias_and_pairs() {
        let joins = vec![JoinSpec::table("posts")
            .alias("p")
            .on_pairs(vec![("author_id".to_string(), "id".to_string())])];
        let clause = compile_joins(&joins, "user", Some("u"), "");
        assert_eq!(clause, " LEFT JOIN `posts` AS p ON (u.`author_id`=p.`id`)");
    }

    #[test]
    fn test_compile_join_prefix_and_columns() {
        let joins = vec![JoinSpec::table("cate")
            .kind(JoinKind::Inner)
            .on_columns("id", "cid")];
        let clause = compile_joins(&joins, "app_post", None, "app_");
        assert_eq!(clause, " INNER JOIN `app_cate` ON app_post.`id`=app_cate.`cid`");
    }

    #[test]
    fn test_compile_join_subquery_fragment() {
        let joins = vec![JoinSpec::table("SELECT id FROM logs")
            .alias("l")
            .on_columns("id", "uid")];
        let clause = compile_joins(&joins, "user", None, "");
        assert_eq!(
            clause,
            " LEFT JOIN (SELECT id FROM logs) AS l ON user.`id`=l.`uid`"
        );
    }

    #[test]
    fn test_compile_raw_join() {
        let joins = vec![JoinSpec::Raw("RIGHT JOIN extra ON extra.id = user.id".to_string())];
        assert_eq!(
            compile_joins(&joins, "user", None, ""),
            " RIGHT JOIN extra ON extra.id = user.id"
        );

        let joins = vec![JoinSpec::Raw("extra".to_string())];
        assert_eq!(compile_joins(&joins, "user", None, ""), " LEFT JOIN extra");
    }

    #[test]
    fn test_from_json_keyed_form() {
        let joins = JoinSpec::from_json(&json!({
            "cate": {"join": "inner", "as": "c", "on": ["id", "cid"]}
        }));
        assert_eq!(
            joins,
            vec![JoinSpec::table("cate")
                .kind(JoinKind::Inner)
                .alias("c")
                .on_columns("id", "cid")]
        );
    }

    #[test]
    fn test_qualified_columns_pass_through() {
        let joins = vec![JoinSpec::table("posts")
            .alias("p")
            .on_pairs(vec![("u.author_id".to_string(), "p.id".to_string())])];
        let clause = compile_joins(&joins, "user", Some("u"), "");
        assert_eq!(clause, " LEFT JOIN `posts` AS p ON (u.author_id=p.id)");
    }
}
