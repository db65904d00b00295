use serde::Serialize;
use stockroom_types::StockRecord;

/// Filter applied by [`LedgerStore::query`](crate::LedgerStore::query).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StockFilter {
    /// Case-insensitive substring match on the record name.
    pub name_contains: Option<String>,
}

impl StockFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn name_contains(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        Self {
            name_contains: (!needle.is_empty()).then_some(needle),
        }
    }

    pub fn matches(&self, record: &StockRecord) -> bool {
        match &self.name_contains {
            Some(needle) => record
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

/// Offset-based page selector. Pages are numbered from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub const DEFAULT_PER_PAGE: u64 = 10;

    /// Zero values are lifted to 1.
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Number of matching rows to skip: `(page - 1) * per_page`.
    pub fn skip(&self) -> usize {
        let skip = (self.page - 1).saturating_mul(self.per_page);
        usize::try_from(skip).unwrap_or(usize::MAX)
    }

    pub fn limit(&self) -> usize {
        usize::try_from(self.per_page).unwrap_or(usize::MAX)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PER_PAGE)
    }
}

/// One page of results plus the total match count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    /// `ceil(total / per_page)`.
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(self.per_page.max(1))
    }
}

/// Apply filter and page to an ordered row sequence.
pub(crate) fn paginate<'a>(
    rows: impl Iterator<Item = &'a StockRecord>,
    filter: &StockFilter,
    request: PageRequest,
) -> Page<StockRecord> {
    let matching: Vec<&StockRecord> = rows.filter(|r| filter.matches(r)).collect();
    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(request.skip())
        .take(request.limit())
        .cloned()
        .collect();
    Page {
        items,
        total,
        page: request.page,
        per_page: request.per_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_math() {
        let page: Page<()> = Page { items: vec![], total: 25, page: 3, per_page: 10 };
        assert_eq!(page.pages(), 3);
        let empty: Page<()> = Page { items: vec![], total: 0, page: 1, per_page: 10 };
        assert_eq!(empty.pages(), 0);
        let exact: Page<()> = Page { items: vec![], total: 20, page: 1, per_page: 10 };
        assert_eq!(exact.pages(), 2);
    }

    #[test]
    fn skip_and_clamping() {
        assert_eq!(PageRequest::new(3, 10).skip(), 20);
        assert_eq!(PageRequest::new(0, 0), PageRequest::new(1, 1));
        assert_eq!(PageRequest::default().per_page, 10);
    }

    #[test]
    fn empty_search_matches_everything() {
        assert_eq!(StockFilter::name_contains(""), StockFilter::all());
    }
}
