//! Common pagination and date-range types shared across services and the
//! store contract.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 250;

/// 1-based page request; page size is clamped to [`MAX_PAGE_SIZE`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        // Fields are public and deserializable, so page 0 can reach us.
        self.page.saturating_sub(1) * self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page)
    }
}

/// Half-open UTC bounds [start, end) covering one calendar date.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps() {
        let p = PageRequest::new(0, 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 1);

        let p = PageRequest::new(3, 10_000);
        assert_eq!(p.per_page, MAX_PAGE_SIZE);
        assert_eq!(p.offset(), 2 * MAX_PAGE_SIZE);
    }

    #[test]
    fn page_zero_built_directly_does_not_underflow() {
        // A host can deserialize {"page":0,...} into the public fields,
        // bypassing `new`.
        let p: PageRequest = serde_json::from_str(r#"{"page":0,"per_page":10}"#).unwrap();
        assert_eq!(p.offset(), 0);
        let p = PageRequest { page: 0, per_page: 10 };
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<u8> = Page {
            items: vec![],
            total: 101,
            page: 1,
            per_page: 50,
        };
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn day_bounds_cover_whole_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let (start, end) = day_bounds(day);
        assert_eq!(start.date_naive(), day);
        assert_eq!((end - chrono::Duration::seconds(1)).date_naive(), day);
        assert_eq!(end.date_naive(), day.succ_opt().unwrap());
    }
}
