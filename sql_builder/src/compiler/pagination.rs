//! Pagination: page descriptors and limit/offset arithmetic

use serde::Serialize;

/// LIMIT description: a bare row count or MySQL's `offset,count` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSpec {
    Count(u64),
    OffsetCount(u64, u64),
}

impl LimitSpec {
    /// Parse `"count"` or `"offset,count"`; non-numeric pieces become 0.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut pieces = text.split(',').map(|piece| {
            piece.trim().parse::<u64>().unwrap_or(0)
        });
        let first = pieces.next()?;
        match pieces.next() {
            Some(second) => Some(LimitSpec::OffsetCount(first, second)),
            None => Some(LimitSpec::Count(first)),
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            LimitSpec::Count(count) => count.to_string(),
            LimitSpec::OffsetCount(offset, count) => format!("{},{}", offset, count),
        }
    }
}

/// A page request: page number plus optional page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub page: u64,
    pub size: Option<u64>,
}

impl PageSpec {
    pub fn new(page: u64) -> Self {
        Self {
            page: page.max(1),
            size: None,
        }
    }

    pub fn with_size(page: u64, size: u64) -> Self {
        Self {
            page: page.max(1),
            size: Some(size),
        }
    }

    /// Parse `"page"` or `"page,size"`. A page below 1 (or one that does not
    /// parse at all) clamps to 1.
    pub fn parse(text: &str) -> Self {
        let mut pieces = text.split(',');
        let page = pieces
            .next()
            .and_then(|piece| piece.trim().parse::<u64>().ok())
            .unwrap_or(1)
            .max(1);
        let size = pieces
            .next()
            .and_then(|piece| piece.trim().parse::<u64>().ok())
            .filter(|size| *size > 0);
        Self { page, size }
    }
}

/// Resolved page arithmetic, also used for count-select page summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u64,
    pub size: u64,
}

/// Translate a page request into a limit/offset pair. An explicit limit
/// always wins; pagination only applies when no limit was set.
pub fn resolve_limit(
    limit: Option<&LimitSpec>,
    page: Option<&PageSpec>,
    default_page_size: u64,
) -> Option<LimitSpec> {
    if let Some(limit) = limit {
        return Some(*limit);
    }
    page.map(|spec| {
        let info = page_info(Some(spec), default_page_size);
        LimitSpec::OffsetCount(info.size * (info.page - 1), info.size)
    })
}

/// Resolve the effective page number and size of a request.
pub fn page_info(page: Option<&PageSpec>, default_page_size: u64) -> PageInfo {
    match page {
        Some(spec) => PageInfo {
            page: spec.page.max(1),
            size: spec.size.unwrap_or(default_page_size).max(1),
        },
        None => PageInfo {
            page: 1,
            size: default_page_size.max(1),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_parse() {
        assert_eq!(PageSpec::parse("3,10"), PageSpec::with_size(3, 10));
        assert_eq!(PageSpec::parse("2"), PageSpec::new(2));
        assert_eq!(PageSpec::parse("0"), PageSpec::new(1));
        assert_eq!(PageSpec::parse("junk"), PageSpec::new(1));
        // A zero size falls back to the configured default
        assert_eq!(PageSpec::parse("2,0"), PageSpec::new(2));
    }

    #[test]
    fn test_resolve_limit_from_page() {
        assert_eq!(
            resolve_limit(None, Some(&PageSpec::with_size(3, 10)), 20),
            Some(LimitSpec::OffsetCount(20, 10))
        );
        assert_eq!(
            resolve_limit(None, Some(&PageSpec::new(2)), 20),
            Some(LimitSpec::OffsetCount(20, 20))
        );
        assert_eq!(
            resolve_limit(None, Some(&PageSpec::new(1)), 20),
            Some(LimitSpec::OffsetCount(0, 20))
        );
    }

    #[test]
    fn test_explicit_limit_wins() {
        assert_eq!(
            resolve_limit(
                Some(&LimitSpec::Count(5)),
                Some(&PageSpec::with_size(3, 10)),
                20
            ),
            Some(LimitSpec::Count(5))
        );
    }

    #[test]
    fn test_limit_parse() {
        assert_eq!(LimitSpec::parse("20"), Some(LimitSpec::Count(20)));
        assert_eq!(LimitSpec::parse("10,20"), Some(LimitSpec::OffsetCount(10, 20)));
        assert_eq!(LimitSpec::parse("x,20"), Some(LimitSpec::OffsetCount(0, 20)));
        assert_eq!(LimitSpec::parse(""), None);
    }
}
