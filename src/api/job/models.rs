use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::db::models::{JobRecord, JobStatus};

/// Payload for creating a job
///
/// `id` may be supplied by the caller (the scraper uses the posting's id);
/// otherwise storage assigns one.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct NewJob {
    pub id: Option<i64>,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Company is required"))]
    pub company: String,
    pub location: Option<String>,
    pub date_created: Option<NaiveDate>,
    pub description: Option<String>,
    pub meta: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    pub date_applied: Option<NaiveDate>,
}

impl NewJob {
    pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            company: company.into(),
            location: None,
            date_created: None,
            description: None,
            meta: None,
            url: None,
            status: JobStatus::Unprocessed,
            date_applied: None,
        }
    }

    /// Materialize the record storage would hold for this payload
    pub fn into_record(self, id: i64, created_at: NaiveDateTime) -> JobRecord {
        JobRecord {
            id,
            title: self.title,
            company: self.company,
            location: self.location,
            date_created: self.date_created,
            description: self.description,
            meta: self.meta,
            url: self.url,
            status: self.status,
            date_applied: self.date_applied,
            created_at,
        }
    }
}

/// Deserialize a field that was present in the body, keeping an explicit `null`
/// apart from an absent key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update of a job's non-identity fields
///
/// For nullable columns the outer `Option` says whether the field was sent and
/// the inner one carries the value, so `{"date_applied": null}` clears the date.
/// Unknown keys are ignored. Serializing writes only the supplied fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, Validate)]
pub struct JobUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Company must not be empty"))]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub date_created: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub date_applied: Option<Option<NaiveDate>>,
}

impl JobUpdate {
    /// Status change as sent to storage: the applied date is always written,
    /// so a non-apply transition clears it.
    pub fn status_change(status: JobStatus, date_applied: Option<NaiveDate>) -> Self {
        Self {
            status: Some(status),
            date_applied: Some(date_applied),
            ..Self::default()
        }
    }

    /// True when no recognized field was supplied
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.company.is_none()
            && self.location.is_none()
            && self.date_created.is_none()
            && self.description.is_none()
            && self.meta.is_none()
            && self.url.is_none()
            && self.status.is_none()
            && self.date_applied.is_none()
    }

    /// Apply the supplied fields to a record in place
    pub fn apply_to(&self, job: &mut JobRecord) {
        if let Some(title) = &self.title {
            job.title = title.clone();
        }
        if let Some(company) = &self.company {
            job.company = company.clone();
        }
        if let Some(location) = &self.location {
            job.location = location.clone();
        }
        if let Some(date_created) = self.date_created {
            job.date_created = date_created;
        }
        if let Some(description) = &self.description {
            job.description = description.clone();
        }
        if let Some(meta) = &self.meta {
            job.meta = meta.clone();
        }
        if let Some(url) = &self.url {
            job.url = url.clone();
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(date_applied) = self.date_applied {
            job.date_applied = date_applied;
        }
    }
}
