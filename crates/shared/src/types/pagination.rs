//! Limit/offset pagination for list and report queries.

use serde::{Deserialize, Serialize};

/// Request parameters for paginated queries.
///
/// `limit` is optional so that each query can apply its own default and cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum number of items to return.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Number of items to skip.
    #[serde(default)]
    pub offset: u64,
}

impl PageRequest {
    /// Creates a request for `limit` items starting at `offset`.
    #[must_use]
    pub const fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Resolves the effective limit: `default` when unset, never above `max`,
    /// never below 1.
    #[must_use]
    pub fn effective_limit(&self, default: u64, max: u64) -> u64 {
        self.limit.unwrap_or(default).clamp(1, max.max(1))
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub data: Vec<T>,
    /// Total number of items matching the query.
    pub total: u64,
    /// Limit that was applied.
    pub limit: u64,
    /// Offset that was applied.
    pub offset: u64,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub const fn new(data: Vec<T>, total: u64, limit: u64, offset: u64) -> Self {
        Self {
            data,
            total,
            limit,
            offset,
        }
    }

    /// Returns true if more items exist after this page.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.offset.saturating_add(self.data.len() as u64) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, 1000, 5000, 1000)]
    #[case(Some(50), 1000, 5000, 50)]
    #[case(Some(9000), 1000, 5000, 5000)]
    #[case(Some(0), 1000, 5000, 1)]
    fn test_effective_limit(
        #[case] limit: Option<u64>,
        #[case] default: u64,
        #[case] max: u64,
        #[case] expected: u64,
    ) {
        let request = PageRequest { limit, offset: 0 };
        assert_eq!(request.effective_limit(default, max), expected);
    }

    #[test]
    fn test_has_more() {
        let page = PageResponse::new(vec![1, 2, 3], 10, 3, 0);
        assert!(page.has_more());

        let last = PageResponse::new(vec![10], 10, 3, 9);
        assert!(!last.has_more());
    }
}
