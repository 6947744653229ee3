//! Daily planning and stagnation recovery.
//!
//! - [`budget`] picks the day's milestones from a time budget
//! - [`progress`] keeps `progress_percent` in line with milestone state
//! - [`wbs_sync`] rebuilds milestones from a project's WBS tree
//! - [`stagnation`] runs the once-a-day inactivity sweep
//! - [`adjust`] asks the language model to make a stalled project easier
//! - [`plan`] assembles a day and handles completions
//! - [`projects`] is project lifecycle
//! - [`generate`] covers model-driven planning and two-minute breakdowns

pub mod adjust;
pub mod budget;
pub mod generate;
pub mod plan;
pub mod progress;
pub mod projects;
pub mod stagnation;
pub mod wbs_sync;

pub use adjust::{AdjustMode, AdjustOutcome, DifficultyAdjuster};
pub use budget::{TimeEstimate, select_by_time_budget};
pub use stagnation::{Escalation, SweepReport, run_daily_sweep};
pub use wbs_sync::{WbsSyncReport, apply_tree};

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::de::DeserializeOwned;

use crate::llm::strip_code_fences;
use crate::{Error, Result};

/// Today's date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The local calendar day a timestamp falls on.
pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

/// `[start, end)` of a local calendar day, in UTC.
pub fn local_day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (local_midnight(date), local_midnight(date.succ_opt().unwrap_or(date)))
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Parse a model reply as JSON, tolerating a surrounding code fence.
///
/// Failures keep the raw reply for diagnosis.
pub(crate) fn parse_generated<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(strip_code_fences(raw)).map_err(|e| {
        tracing::warn!(error = %e, raw, "could not parse generated output");
        Error::GenerationParse {
            message: e.to_string(),
            raw: raw.to_string(),
        }
    })
}

/// Reject a blank title.
pub(crate) fn require_title(title: &str, what: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} title must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

/// Reject a zero minute count.
pub(crate) fn require_positive_minutes(minutes: Option<u32>, what: &str) -> Result<Option<u32>> {
    match minutes {
        Some(0) => Err(Error::Validation(format!("{} must be a positive number of minutes", what))),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Reply {
        value: u32,
    }

    #[test]
    fn test_parse_generated_accepts_fenced_json() {
        let reply: Reply = parse_generated("```json\n{\"value\": 7}\n```").unwrap();
        assert_eq!(reply.value, 7);
    }

    #[test]
    fn test_parse_generated_keeps_raw_on_failure() {
        let err = parse_generated::<Reply>("Sure! Here you go: value is 7").unwrap_err();
        match err {
            Error::GenerationParse { raw, .. } => assert!(raw.starts_with("Sure!")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_local_day_bounds_cover_now() {
        let now = Utc::now();
        let (start, end) = local_day_bounds(local_date(now));
        assert!(start <= now && now < end);
    }

    #[test]
    fn test_require_title_and_minutes() {
        assert_eq!(require_title("  Read  ", "Milestone").unwrap(), "Read");
        assert!(matches!(require_title(" ", "Milestone"), Err(Error::Validation(_))));
        assert!(matches!(
            require_positive_minutes(Some(0), "Estimate"),
            Err(Error::Validation(_))
        ));
        assert_eq!(require_positive_minutes(None, "Estimate").unwrap(), None);
    }
}
