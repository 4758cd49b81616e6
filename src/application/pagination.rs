//! Limit/offset pagination shared by every listing endpoint.

use serde::Serialize;

pub const DEFAULT_LIMIT: u32 = 5;
pub const MAX_LIMIT: u32 = 20;

/// A normalized page window.
///
/// Construction clamps the raw query values, so two requests that resolve to
/// the same window always compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl PageRequest {
    /// Non-positive or missing limits fall back to the default, oversized ones
    /// are cut to [`MAX_LIMIT`]. Negative offsets become zero.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(value) if value > 0 => value.min(i64::from(MAX_LIMIT)) as u32,
            _ => DEFAULT_LIMIT,
        };
        let offset = offset.map_or(0, |value| value.max(0) as u64);
        Self { limit, offset }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OffsetPage<T> {
    pub count: u64,
    pub limit: u32,
    pub offset: u64,
    pub next_offset: Option<u64>,
    pub previous_offset: Option<u64>,
    pub results: Vec<T>,
}

impl<T> OffsetPage<T> {
    pub fn new(results: Vec<T>, count: u64, page: PageRequest) -> Self {
        let limit = u64::from(page.limit);
        let next_offset = (page.offset + limit < count).then_some(page.offset + limit);
        let previous_offset = (page.offset > 0).then(|| page.offset.saturating_sub(limit));

        Self {
            count,
            limit: page.limit,
            offset: page.offset,
            next_offset,
            previous_offset,
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> OffsetPage<U> {
        OffsetPage {
            count: self.count,
            limit: self.limit,
            offset: self.offset,
            next_offset: self.next_offset,
            previous_offset: self.previous_offset,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_defaulted_and_capped() {
        assert_eq!(PageRequest::new(None, None), PageRequest::default());
        assert_eq!(PageRequest::new(Some(0), None).limit, DEFAULT_LIMIT);
        assert_eq!(PageRequest::new(Some(-3), None).limit, DEFAULT_LIMIT);
        assert_eq!(PageRequest::new(Some(12), None).limit, 12);
        assert_eq!(PageRequest::new(Some(500), None).limit, MAX_LIMIT);
    }

    #[test]
    fn negative_offset_becomes_zero() {
        assert_eq!(PageRequest::new(None, Some(-10)).offset, 0);
        assert_eq!(PageRequest::new(None, Some(15)).offset, 15);
    }

    #[test]
    fn neighbours_are_computed_from_count() {
        let first = OffsetPage::new(vec![1, 2, 3, 4, 5], 12, PageRequest::new(Some(5), Some(0)));
        assert_eq!(first.next_offset, Some(5));
        assert_eq!(first.previous_offset, None);

        let last = OffsetPage::new(vec![11, 12], 12, PageRequest::new(Some(5), Some(10)));
        assert_eq!(last.next_offset, None);
        assert_eq!(last.previous_offset, Some(5));

        let ragged = OffsetPage::new(vec![3], 4, PageRequest::new(Some(5), Some(3)));
        assert_eq!(ragged.previous_offset, Some(0));
    }
}
