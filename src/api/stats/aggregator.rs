use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::models::{JobRecord, StatusCounts};
use crate::db::repository::{JobRepository, RepositoryError};

/// Length of the trailing applied-per-day series, today included
pub const TRAILING_DAYS: u64 = 30;

/// Applications on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyApplied {
    #[serde(rename = "date_applied")]
    pub date: NaiveDate,
    #[serde(rename = "job_applied")]
    pub count: i64,
}

/// Dashboard statistics, derived on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    #[serde(flatten)]
    pub counts: StatusCounts,
    /// Exactly `TRAILING_DAYS` entries, most recent day first
    #[serde(rename = "appliedCount")]
    pub daily_applied: Vec<DailyApplied>,
}

/// Status counts and the trailing applied-per-day series
pub struct StatsAggregator;

impl StatsAggregator {
    /// First and last day of the window ending `today`
    pub fn window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let from = today
            .checked_sub_days(Days::new(TRAILING_DAYS - 1))
            .unwrap_or(NaiveDate::MIN);
        (from, today)
    }

    /// Count records per status in one pass
    pub fn count_statuses<'a>(jobs: impl IntoIterator<Item = &'a JobRecord>) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for job in jobs {
            counts.record(job.status);
        }
        counts
    }

    /// Expand sparse per-day counts into the contiguous window, newest first,
    /// with zero for days that had no applications
    pub fn daily_series(today: NaiveDate, per_day: &[(NaiveDate, i64)]) -> Vec<DailyApplied> {
        let by_day: HashMap<NaiveDate, i64> = per_day.iter().copied().collect();

        (0..TRAILING_DAYS)
            .map_while(|offset| today.checked_sub_days(Days::new(offset)))
            .map(|date| DailyApplied {
                date,
                count: by_day.get(&date).copied().unwrap_or(0),
            })
            .collect()
    }

    /// Build the snapshot from storage
    ///
    /// The counts and the series are two separate reads run concurrently. A
    /// write landing between them can make the two disagree; that looseness is
    /// accepted.
    pub async fn snapshot(
        repo: &dyn JobRepository,
        today: NaiveDate,
    ) -> Result<StatisticsSnapshot, RepositoryError> {
        let (from, to) = Self::window(today);

        let (counts, per_day) =
            futures_util::try_join!(repo.status_counts(), repo.applied_per_day(from, to))?;

        debug!(
            "Statistics: total={}, applied days with activity={}",
            counts.total,
            per_day.len()
        );

        Ok(StatisticsSnapshot {
            counts,
            daily_applied: Self::daily_series(today, &per_day),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::job::models::NewJob;
    use crate::db::models::JobStatus;
    use chrono::NaiveDateTime;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_spans_thirty_days_inclusive() {
        let (from, to) = StatsAggregator::window(day(2024, 3, 30));
        assert_eq!(from, day(2024, 3, 1));
        assert_eq!(to, day(2024, 3, 30));
    }

    #[test]
    fn empty_series_is_thirty_zeroes() {
        let today = day(2024, 3, 1);
        let series = StatsAggregator::daily_series(today, &[]);

        assert_eq!(series.len(), 30);
        assert_eq!(series[0].date, today);
        assert!(series.iter().all(|entry| entry.count == 0));
    }

    #[test]
    fn series_is_contiguous_and_descending_across_month_end() {
        let today = day(2024, 3, 2);
        let series = StatsAggregator::daily_series(today, &[]);

        for pair in series.windows(2) {
            assert_eq!(pair[0].date.pred_opt().unwrap(), pair[1].date);
        }
        assert_eq!(series[1].date, day(2024, 3, 1));
        assert_eq!(series[2].date, day(2024, 2, 29));
        assert_eq!(series[29].date, day(2024, 2, 2));
    }

    #[test]
    fn series_fills_in_counts_by_day() {
        let today = day(2024, 3, 30);
        let series = StatsAggregator::daily_series(
            today,
            &[(day(2024, 3, 28), 4), (day(2024, 3, 30), 1), (day(2024, 1, 1), 9)],
        );

        assert_eq!(series[0].count, 1);
        assert_eq!(series[1].count, 0);
        assert_eq!(series[2].count, 4);
        assert_eq!(series.iter().map(|entry| entry.count).sum::<i64>(), 5);
    }

    #[test]
    fn status_counts_sum_to_total() {
        let jobs: Vec<JobRecord> = [0i16, 1, 2, 3, 3, 1]
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut job = NewJob::new("Job", "Acme");
                job.status = JobStatus::try_from(*status).unwrap();
                job.into_record(i as i64, NaiveDateTime::default())
            })
            .collect();

        let counts = StatsAggregator::count_statuses(&jobs);

        assert_eq!(counts.unprocessed, 1);
        assert_eq!(counts.rejected, 2);
        assert_eq!(counts.accepted, 1);
        assert_eq!(counts.applied, 2);
        assert_eq!(
            counts.unprocessed + counts.rejected + counts.accepted + counts.applied,
            counts.total
        );
    }
}
