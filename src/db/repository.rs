use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::api::job::models::{JobUpdate, NewJob};
use crate::db::filter::JobFilter;
use crate::db::models::{JobRecord, StatusCounts};

/// Storage-level errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// A caller-supplied id is already taken
    #[error("duplicate key value violates unique constraint \"jobs_pkey\": Key (id)=({0}) already exists.")]
    DuplicateId(i64),
}

/// Persisted job collection
///
/// Reads and writes carry no isolation guarantee beyond what the backing store
/// gives a single statement.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Jobs matching every predicate of `filter`, ordered by id
    async fn list(
        &self,
        filter: &JobFilter,
        now: NaiveDateTime,
    ) -> Result<Vec<JobRecord>, RepositoryError>;

    async fn get(&self, id: i64) -> Result<Option<JobRecord>, RepositoryError>;

    /// Insert a job and return its id
    async fn insert(&self, job: &NewJob) -> Result<i64, RepositoryError>;

    /// Insert many jobs atomically, returning the number of rows written
    async fn insert_many(&self, jobs: &[NewJob]) -> Result<u64, RepositoryError>;

    /// Apply a partial update; `false` if no job has this id
    async fn update(&self, id: i64, update: &JobUpdate) -> Result<bool, RepositoryError>;

    /// Permanently remove a job; `false` if no job has this id
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;

    async fn status_counts(&self) -> Result<StatusCounts, RepositoryError>;

    /// `(day, count)` of jobs applied on each day in `from..=to` that has any.
    /// Days without applications are omitted.
    async fn applied_per_day(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, i64)>, RepositoryError>;

    /// Cheap connectivity probe
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Release connections on shutdown
    async fn close(&self) {}
}
