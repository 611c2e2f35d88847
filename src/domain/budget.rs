//! Monthly token budget accounting
//!
//! Pure functions behind the allowance check. The database layer locks the
//! profile row, feeds its counters through [`TokenBudget::evaluate`] and
//! writes back whatever the decision says.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Characters per token used by the estimation heuristic
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate prompt tokens: one token per 4 characters, rounded up
pub fn estimate_prompt_tokens(prompt: &str) -> i32 {
    let chars = prompt.chars().count();
    let tokens = chars.div_ceil(CHARS_PER_TOKEN);
    i32::try_from(tokens).unwrap_or(i32::MAX)
}

/// Estimate the worst-case cost of a generation: prompt plus the full completion budget
pub fn estimate_total_tokens(prompt: &str, max_tokens: i32) -> i32 {
    estimate_prompt_tokens(prompt).saturating_add(max_tokens.max(0))
}

/// Tokens to charge once the provider has answered.
///
/// Providers occasionally omit usage; the estimate is charged in that case.
pub fn charged_tokens(reported: i32, estimate: i32) -> i32 {
    if reported > 0 { reported } else { estimate }
}

/// Counter adjustment once a generation settles.
///
/// A reservation taken before the latest monthly reset was already wiped by
/// that reset, so the whole charge is booked instead of the difference.
pub fn settle_adjustment(same_period: bool, reserved: i32, charged: i32) -> i32 {
    if same_period { charged.saturating_sub(reserved) } else { charged }
}

/// Counter adjustment when a failed generation hands its reservation back
pub fn refund_adjustment(same_period: bool, reserved: i32) -> i32 {
    if same_period { -reserved } else { 0 }
}

/// Day a usage statistics row is booked under, always the UTC date
pub fn usage_day(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Whether the counter belongs to an earlier calendar month than `now`
pub fn needs_monthly_reset(last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    last_reset < now && (last_reset.year() != now.year() || last_reset.month() != now.month())
}

/// Outcome of an allowance check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AllowanceDecision {
    /// The monthly counter must be reset before anything else
    pub reset: bool,
    /// Tokens used this month after an eventual reset
    pub tokens_used: i32,
    pub monthly_token_limit: i32,
    pub available: i32,
    pub allowed: bool,
}

/// Snapshot of a profile's token counters
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    pub monthly_token_limit: i32,
    pub tokens_used: i32,
    pub last_token_reset: DateTime<Utc>,
}

impl TokenBudget {
    /// Apply the monthly reset rule, then compare what is left against `estimate`
    pub fn evaluate(&self, now: DateTime<Utc>, estimate: i32) -> AllowanceDecision {
        let reset = needs_monthly_reset(self.last_token_reset, now);
        let tokens_used = if reset { 0 } else { self.tokens_used };
        let available = self.monthly_token_limit.saturating_sub(tokens_used);

        AllowanceDecision {
            reset,
            tokens_used,
            monthly_token_limit: self.monthly_token_limit,
            available,
            allowed: available >= estimate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_estimate_rounds_up() {
        assert_eq!(estimate_prompt_tokens(""), 0);
        assert_eq!(estimate_prompt_tokens("abcd"), 1);
        assert_eq!(estimate_prompt_tokens("abcde"), 2);
    }

    #[test]
    fn test_estimate_counts_characters_not_bytes() {
        // 8 Vietnamese characters, 20+ bytes in UTF-8
        assert_eq!(estimate_prompt_tokens("Việt Nam"), 2);
    }

    #[test]
    fn test_total_estimate_adds_completion_budget() {
        assert_eq!(estimate_total_tokens("abcdefgh", 1024), 1026);
        assert_eq!(estimate_total_tokens("abcd", -5), 1);
    }

    #[test]
    fn test_charged_tokens_falls_back_to_estimate() {
        assert_eq!(charged_tokens(350, 1100), 350);
        assert_eq!(charged_tokens(0, 1100), 1100);
    }

    #[test]
    fn test_settle_books_difference_within_period() {
        assert_eq!(settle_adjustment(true, 1100, 300), -800);
        assert_eq!(settle_adjustment(true, 1100, 1100), 0);
    }

    #[test]
    fn test_settle_after_reset_books_full_charge() {
        // Reserved on Oct 31, counter reset on Nov 1 before the answer came back
        assert_eq!(settle_adjustment(false, 1100, 300), 300);
    }

    #[test]
    fn test_refund_after_reset_leaves_counter_alone() {
        assert_eq!(refund_adjustment(true, 1100), -1100);
        assert_eq!(refund_adjustment(false, 1100), 0);
    }

    #[test]
    fn test_usage_day_is_utc_date() {
        let late = Utc.with_ymd_and_hms(2026, 10, 31, 23, 30, 0).unwrap();
        assert_eq!(usage_day(late), NaiveDate::from_ymd_opt(2026, 10, 31).unwrap());
    }

    #[test]
    fn test_reset_on_new_month() {
        assert!(needs_monthly_reset(at(2026, 9, 30), at(2026, 10, 1)));
        assert!(needs_monthly_reset(at(2025, 10, 15), at(2026, 10, 15)));
        assert!(!needs_monthly_reset(at(2026, 10, 1), at(2026, 10, 31)));
    }

    #[test]
    fn test_no_reset_for_future_timestamp() {
        assert!(!needs_monthly_reset(at(2026, 11, 2), at(2026, 10, 19)));
    }

    #[test]
    fn test_exceeding_limit_blocks_generation() {
        let budget = TokenBudget {
            monthly_token_limit: 10_000,
            tokens_used: 9_500,
            last_token_reset: at(2026, 10, 1),
        };

        let decision = budget.evaluate(at(2026, 10, 19), 1_024);
        assert!(!decision.reset);
        assert_eq!(decision.available, 500);
        assert!(!decision.allowed);
    }

    #[test]
    fn test_exact_remaining_is_allowed() {
        let budget = TokenBudget {
            monthly_token_limit: 2_000,
            tokens_used: 976,
            last_token_reset: at(2026, 10, 1),
        };

        assert!(budget.evaluate(at(2026, 10, 19), 1_024).allowed);
    }

    #[test]
    fn test_reset_restores_allowance() {
        let budget = TokenBudget {
            monthly_token_limit: 10_000,
            tokens_used: 10_000,
            last_token_reset: at(2026, 9, 3),
        };

        let decision = budget.evaluate(at(2026, 10, 2), 1_024);
        assert!(decision.reset);
        assert_eq!(decision.tokens_used, 0);
        assert_eq!(decision.available, 10_000);
        assert!(decision.allowed);
    }
}
