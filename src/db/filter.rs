use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::db::models::JobRecord;

/// Raw `GET /jobs` query parameters, kept as strings so bad input can be dropped
/// instead of failing the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct JobQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// A single status or a comma-separated list, e.g. `1,3`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Only jobs created within the last N days
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<String>,
}

impl JobQuery {
    /// Build from raw query-string pairs. A repeated `status` key extends the
    /// list; for `id` and `days` the last occurrence wins. Unknown keys are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = JobQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "id" => query.id = Some(value),
                "days" => query.days = Some(value),
                "status" => {
                    query.status = Some(match query.status.take() {
                        Some(existing) => format!("{},{}", existing, value),
                        None => value,
                    })
                }
                _ => {}
            }
        }
        query
    }

    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }
}

/// Validated job filter
///
/// Each field is one AND-ed predicate. Parameters that fail to parse never make
/// it in here, so the query loses constraints instead of erroring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub id: Option<i64>,
    /// Set-membership test over raw status values. Values outside 0..=3
    /// parse fine and simply match nothing.
    pub statuses: Vec<i16>,
    pub days: Option<i64>,
}

impl JobFilter {
    pub fn parse(query: &JobQuery) -> Self {
        let id = query
            .id
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok());

        let statuses = query
            .status
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .filter_map(|token| token.trim().parse::<i16>().ok())
                    .collect()
            })
            .unwrap_or_default();

        let days = query
            .days
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|days| *days > 0);

        Self { id, statuses, days }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.id.is_none() && self.statuses.is_empty() && self.days.is_none()
    }

    /// Creation cutoff for the recency window. A window too large to
    /// represent covers everything, so it drops out.
    pub fn created_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let days = self.days?;
        Duration::try_days(days).and_then(|window| now.checked_sub_signed(window))
    }

    /// Evaluate the filter against a single record
    pub fn matches(&self, job: &JobRecord, now: NaiveDateTime) -> bool {
        if self.id.is_some_and(|id| job.id != id) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&i16::from(job.status)) {
            return false;
        }
        if let Some(cutoff) = self.created_after(now) {
            if job.created_at <= cutoff {
                return false;
            }
        }
        true
    }

    /// Append the `WHERE` clause for this filter, binding every value
    pub fn push_where(&self, query: &mut QueryBuilder<'_, Postgres>, now: NaiveDateTime) {
        let mut keyword = " WHERE ";

        if let Some(id) = self.id {
            query.push(keyword).push("id = ").push_bind(id);
            keyword = " AND ";
        }

        if !self.statuses.is_empty() {
            query.push(keyword).push("status IN (");
            {
                let mut values = query.separated(", ");
                for status in &self.statuses {
                    values.push_bind(*status);
                }
                values.push_unseparated(")");
            }
            keyword = " AND ";
        }

        if let Some(cutoff) = self.created_after(now) {
            query.push(keyword).push("created_at > ").push_bind(cutoff);
        }
    }
}

impl From<&JobQuery> for JobFilter {
    fn from(query: &JobQuery) -> Self {
        JobFilter::parse(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::job::models::NewJob;
    use crate::db::models::JobStatus;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn job(id: i64, status: JobStatus, age_days: i64) -> JobRecord {
        let mut new_job = NewJob::new(format!("Job {}", id), "Acme");
        new_job.status = status;
        new_job.into_record(id, now() - Duration::days(age_days))
    }

    fn query(id: Option<&str>, status: Option<&str>, days: Option<&str>) -> JobQuery {
        JobQuery {
            id: id.map(str::to_string),
            status: status.map(str::to_string),
            days: days.map(str::to_string),
        }
    }

    #[test]
    fn pairs_merge_repeated_status() {
        let pairs = vec![
            ("status".to_string(), "1".to_string()),
            ("page".to_string(), "2".to_string()),
            ("status".to_string(), "3".to_string()),
            ("days".to_string(), "4".to_string()),
        ];
        let query = JobQuery::from_pairs(pairs);
        assert_eq!(query.status.as_deref(), Some("1,3"));
        assert_eq!(query.days.as_deref(), Some("4"));
        assert_eq!(query.id, None);
    }

    #[test]
    fn empty_query_is_unfiltered() {
        let filter = JobFilter::parse(&JobQuery::default());
        assert!(filter.is_unfiltered());
        assert!(filter.matches(&job(1, JobStatus::Applied, 400), now()));
    }

    #[test]
    fn status_list_drops_bad_tokens() {
        let filter = JobFilter::parse(&query(None, Some("1, x,,3 "), None));
        assert_eq!(filter.statuses, vec![1, 3]);
    }

    #[test]
    fn all_invalid_status_tokens_drop_the_predicate() {
        let filter = JobFilter::parse(&query(None, Some("a,b,"), None));
        assert!(filter.is_unfiltered());
    }

    #[test]
    fn invalid_id_and_days_are_dropped() {
        let filter = JobFilter::parse(&query(Some("abc"), None, Some("-3")));
        assert!(filter.is_unfiltered());
        let filter = JobFilter::parse(&query(None, None, Some("0")));
        assert!(filter.is_unfiltered());
        let filter = JobFilter::parse(&query(None, None, Some("soon")));
        assert!(filter.is_unfiltered());
    }

    #[test]
    fn status_membership_matches_union() {
        let filter = JobFilter::parse(&JobQuery::with_status("1,3"));
        let statuses = [0i16, 1, 2, 3, 1];
        let matched: Vec<i64> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| job(i as i64 + 1, JobStatus::try_from(*s).unwrap(), 0))
            .filter(|j| filter.matches(j, now()))
            .map(|j| j.id)
            .collect();
        assert_eq!(matched, vec![2, 4, 5]);
    }

    #[test]
    fn out_of_range_status_matches_nothing() {
        let filter = JobFilter::parse(&JobQuery::with_status("7"));
        assert!(!filter.matches(&job(1, JobStatus::Unprocessed, 0), now()));
    }

    #[test]
    fn predicates_are_anded() {
        let filter = JobFilter::parse(&query(Some("2"), Some("3"), Some("7")));
        assert!(filter.matches(&job(2, JobStatus::Applied, 1), now()));
        assert!(!filter.matches(&job(2, JobStatus::Rejected, 1), now()));
        assert!(!filter.matches(&job(3, JobStatus::Applied, 1), now()));
        assert!(!filter.matches(&job(2, JobStatus::Applied, 8), now()));
    }

    #[test]
    fn recency_window_is_exclusive_at_cutoff() {
        let filter = JobFilter::parse(&query(None, None, Some("7")));
        assert!(!filter.matches(&job(1, JobStatus::Unprocessed, 7), now()));
        assert!(filter.matches(&job(1, JobStatus::Unprocessed, 6), now()));
    }

    #[test]
    fn huge_window_covers_everything() {
        let filter = JobFilter::parse(&query(None, None, Some("9223372036854775807")));
        assert_eq!(filter.created_after(now()), None);
        assert!(filter.matches(&job(1, JobStatus::Unprocessed, 10_000), now()));
    }

    #[test]
    fn where_clause_binds_each_predicate() {
        let filter = JobFilter::parse(&query(Some("5"), Some("0,2"), Some("30")));
        let mut sql = QueryBuilder::<Postgres>::new("SELECT * FROM jobs");
        filter.push_where(&mut sql, now());
        assert_eq!(
            sql.sql(),
            "SELECT * FROM jobs WHERE id = $1 AND status IN ($2, $3) AND created_at > $4"
        );
    }

    #[test]
    fn where_clause_is_omitted_without_predicates() {
        let mut sql = QueryBuilder::<Postgres>::new("SELECT * FROM jobs");
        JobFilter::default().push_where(&mut sql, now());
        assert_eq!(sql.sql(), "SELECT * FROM jobs");
    }

    #[test]
    fn single_status_where_clause() {
        let filter = JobFilter::parse(&JobQuery::with_status("2"));
        let mut sql = QueryBuilder::<Postgres>::new("SELECT * FROM jobs");
        filter.push_where(&mut sql, now());
        assert_eq!(sql.sql(), "SELECT * FROM jobs WHERE status IN ($1)");
    }
}
