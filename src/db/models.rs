use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Base of the external posting link used when a job has no `url`
pub const FALLBACK_LINK_BASE: &str = "https://www.linkedin.com/jobs/view/";

/// Triage status of a job posting, stored as a small integer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum JobStatus {
    #[default]
    Unprocessed = 0,
    Rejected = 1,
    Accepted = 2,
    Applied = 3,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Unprocessed,
        JobStatus::Rejected,
        JobStatus::Accepted,
        JobStatus::Applied,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid job status {0}, expected 0 (unprocessed), 1 (rejected), 2 (accepted) or 3 (applied)")]
pub struct InvalidStatus(pub i16);

impl TryFrom<i16> for JobStatus {
    type Error = InvalidStatus;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(JobStatus::Unprocessed),
            1 => Ok(JobStatus::Rejected),
            2 => Ok(JobStatus::Accepted),
            3 => Ok(JobStatus::Applied),
            other => Err(InvalidStatus(other)),
        }
    }
}

impl From<JobStatus> for i16 {
    fn from(status: JobStatus) -> Self {
        status as i16
    }
}

/// Database representation of a job posting with all fields
///
/// `description` is carried as raw markup. Nothing here sanitizes it; whoever
/// renders it decides whether to trust it.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub date_created: Option<NaiveDate>,
    pub description: Option<String>,
    pub meta: Option<String>,
    pub url: Option<String>,
    #[sqlx(try_from = "i16")]
    pub status: JobStatus,
    pub date_applied: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

impl JobRecord {
    /// External link for the posting: its own `url`, or the listing page by id
    pub fn link(&self) -> String {
        match self.url.as_deref() {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("{}{}", FALLBACK_LINK_BASE, self.id),
        }
    }
}

/// Per-status record counts plus the total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StatusCounts {
    pub unprocessed: i64,
    pub rejected: i64,
    pub accepted: i64,
    pub applied: i64,
    pub total: i64,
}

impl StatusCounts {
    pub fn get(&self, status: JobStatus) -> i64 {
        match status {
            JobStatus::Unprocessed => self.unprocessed,
            JobStatus::Rejected => self.rejected,
            JobStatus::Accepted => self.accepted,
            JobStatus::Applied => self.applied,
        }
    }

    /// Count one record with the given status
    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Unprocessed => self.unprocessed += 1,
            JobStatus::Rejected => self.rejected += 1,
            JobStatus::Accepted => self.accepted += 1,
            JobStatus::Applied => self.applied += 1,
        }
        self.total += 1;
    }
}
