//! Pagination query parameters and the response block shared by every
//! paginated endpoint.

use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    /// Clamp raw query values: page is 1-based, limit capped at 100.
    pub fn clamped(&self, default_limit: i64) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT);
        (page, limit)
    }

    pub fn page_and_limit(&self) -> (i64, i64) {
        self.clamped(DEFAULT_LIMIT)
    }

    pub fn offset(page: i64, limit: i64) -> i64 {
        (page - 1) * limit
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub limit: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total_count: i64) -> Self {
        let total_pages = if total_count == 0 {
            0
        } else {
            (total_count + limit - 1) / limit
        };
        Self {
            current_page: page,
            total_pages,
            total_count,
            limit,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_params() {
        let params = PageParams { page: Some(0), limit: Some(500) };
        assert_eq!(params.page_and_limit(), (1, 100));

        let params = PageParams { page: Some(-3), limit: Some(0) };
        assert_eq!(params.page_and_limit(), (1, 1));

        let params = PageParams { page: None, limit: None };
        assert_eq!(params.page_and_limit(), (1, 10));
    }

    #[test]
    fn pagination_block_math() {
        let p = Pagination::new(2, 10, 35);
        assert_eq!(p.total_pages, 4);
        assert!(p.has_next_page);
        assert!(p.has_prev_page);

        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page);
        assert!(!p.has_prev_page);

        let last = Pagination::new(4, 10, 35);
        assert!(!last.has_next_page);
        assert!(last.has_prev_page);
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(PageParams::offset(1, 10), 0);
        assert_eq!(PageParams::offset(3, 25), 50);
    }
}
