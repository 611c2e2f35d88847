//! Content listing helpers: titles, pagination and reporting periods

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Titles are cut to this many characters
pub const TITLE_MAX_CHARS: usize = 50;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Derive a content title from its prompt: first 50 characters, `...` when cut
pub fn derive_title(prompt: &str) -> String {
    let mut chars = prompt.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// 1-indexed page request, clamped to sane bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(None, None)
    }
}

/// A page of results plus the exact total
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let has_more = request.page.saturating_mul(request.limit) < total;
        Page {
            items,
            total,
            page: request.page,
            limit: request.limit,
            has_more,
        }
    }
}

/// Reporting window for usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UsagePeriod {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl UsagePeriod {
    /// First date included in the window ending `today`
    pub fn start_date(&self, today: NaiveDate) -> NaiveDate {
        let start = match self {
            UsagePeriod::Day => today.checked_sub_days(Days::new(1)),
            UsagePeriod::Week => today.checked_sub_days(Days::new(7)),
            UsagePeriod::Month => today.checked_sub_months(Months::new(1)),
            UsagePeriod::Year => today.checked_sub_months(Months::new(12)),
        };
        start.unwrap_or(NaiveDate::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_prompt_title_unchanged() {
        assert_eq!(derive_title("Viết bài về cà phê"), "Viết bài về cà phê");
    }

    #[test]
    fn test_long_prompt_title_truncated() {
        let prompt = "ă".repeat(60);
        let title = derive_title(&prompt);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_exactly_fifty_chars_not_marked() {
        let prompt = "a".repeat(50);
        assert_eq!(derive_title(&prompt), prompt);
    }

    #[test]
    fn test_page_request_clamping() {
        let req = PageRequest::new(Some(0), Some(1_000));
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, MAX_PAGE_SIZE);

        let req = PageRequest::new(Some(3), Some(10));
        assert_eq!(req.offset(), 20);
        assert_eq!(PageRequest::default().limit, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_page_has_more() {
        let req = PageRequest::new(Some(2), Some(10));
        assert!(Page::new(vec![0; 10], 25, req).has_more);
        assert!(!Page::new(vec![0; 5], 25, PageRequest::new(Some(3), Some(10))).has_more);
    }

    #[test]
    fn test_usage_period_start_dates() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        assert_eq!(UsagePeriod::Day.start_date(today), NaiveDate::from_ymd_opt(2026, 3, 30).unwrap());
        assert_eq!(UsagePeriod::Week.start_date(today), NaiveDate::from_ymd_opt(2026, 3, 24).unwrap());
        // Month arithmetic clamps to the last valid day
        assert_eq!(UsagePeriod::Month.start_date(today), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        assert_eq!(UsagePeriod::Year.start_date(today), NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    }
}
