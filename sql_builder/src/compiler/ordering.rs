//! Ordering descriptor types

/// Sort direction for one ORDER BY column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Case-insensitive parse; anything unrecognized falls back to ASC.
    pub fn parse(token: &str) -> Self {
        if token.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

/// ORDER BY description: a raw fragment, a plain column list, or
/// column/direction pairs.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderBy {
    Raw(String),
    Columns(Vec<String>),
    Directed(Vec<(String, SortOrder)>),
}

impl OrderBy {
    /// Resolve a JSON order descriptor: string passthrough, array of
    /// columns, or a column→direction map.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(text) if !text.is_empty() => {
                Some(OrderBy::Raw(text.clone()))
            }
            serde_json::Value::Array(items) => Some(OrderBy::Columns(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            )),
            serde_json::Value::Object(map) => Some(OrderBy::Directed(
                map.iter()
                    .map(|(column, direction)| {
                        let direction = direction
                            .as_str()
                            .map(SortOrder::parse)
                            .unwrap_or_default();
                        (column.clone(), direction)
                    })
                    .collect(),
            )),
            _ => None,
        }
    }
}
