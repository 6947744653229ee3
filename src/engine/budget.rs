//! Time-budget selection.
//!
//! Greedy prefix selection in priority order: walk the items, take each one
//! that still fits, and stop at the first that doesn't. A later, smaller item
//! is never pulled forward. The first item is always taken, even when it
//! alone blows the budget, so a non-empty candidate list never yields an
//! empty day.

use crate::models::{DEFAULT_DAILY_MINUTES, DEFAULT_ESTIMATE_MINUTES, Milestone};

/// Anything with an optional time estimate in minutes.
pub trait TimeEstimate {
    fn estimated_minutes(&self) -> Option<i64>;

    /// The estimate used for budgeting: unset or non-positive counts as 25.
    fn budget_minutes(&self) -> u64 {
        match self.estimated_minutes() {
            Some(m) if m > 0 => m as u64,
            _ => u64::from(DEFAULT_ESTIMATE_MINUTES),
        }
    }
}

impl TimeEstimate for Milestone {
    fn estimated_minutes(&self) -> Option<i64> {
        self.estimated_minutes.map(i64::from)
    }
}

/// Return the prefix of `items` that fits in `daily_minutes` (default 60).
pub fn select_by_time_budget<T: TimeEstimate>(items: &[T], daily_minutes: Option<u32>) -> &[T] {
    let budget = u64::from(daily_minutes.unwrap_or(DEFAULT_DAILY_MINUTES));
    let mut used = 0u64;
    let mut taken = 0usize;

    for item in items {
        let estimate = item.budget_minutes();
        if taken > 0 && used + estimate > budget {
            break;
        }
        used += estimate;
        taken += 1;
    }

    tracing::debug!(candidates = items.len(), taken, used, budget, "selected by time budget");
    &items[..taken]
}
