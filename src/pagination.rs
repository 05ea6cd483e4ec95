use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Raw `?page=&limit=` query. Kept as strings so junk values fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

impl From<PageQuery> for Page {
    fn from(q: PageQuery) -> Self {
        Self::new(
            positive_or(q.page.as_deref(), DEFAULT_PAGE),
            positive_or(q.limit.as_deref(), DEFAULT_LIMIT),
        )
    }
}

fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub total: u64,
    pub page: u64,
    pub pages: u64,
    pub limit: u64,
}

impl PaginationMeta {
    pub fn new(total: u64, page: Page) -> Self {
        Self {
            total,
            page: page.page,
            pages: total.div_ceil(page.limit),
            limit: page.limit,
        }
    }
}
