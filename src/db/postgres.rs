use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{Pool, Postgres, QueryBuilder};
use tracing::debug;

use crate::api::job::models::{JobUpdate, NewJob};
use crate::clock::Clock;
use crate::db::filter::JobFilter;
use crate::db::models::{JobRecord, StatusCounts};
use crate::db::repository::{JobRepository, RepositoryError};

const JOB_COLUMNS: &str = "id, title, company, location, date_created, description, meta, url, status, date_applied, created_at";

/// Postgres keeps one bind parameter list per statement; stay well under its limit.
const INSERT_CHUNK: usize = 1000;

/// INSERT for `jobs` with `created_at` taken from the application clock, the
/// same clock `days` cutoffs are computed from. A missing id draws from the
/// serial sequence.
fn insert_statement(jobs: &[NewJob], created_at: NaiveDateTime) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO jobs (id, title, company, location, date_created, description, meta, url, status, date_applied, created_at) ",
    );
    query.push_values(jobs, |mut row, job| {
        row.push("COALESCE(")
            .push_bind_unseparated(job.id)
            .push_unseparated(", nextval(pg_get_serial_sequence('jobs', 'id')))")
            .push_bind(job.title.clone())
            .push_bind(job.company.clone())
            .push_bind(job.location.clone())
            .push_bind(job.date_created)
            .push_bind(job.description.clone())
            .push_bind(job.meta.clone())
            .push_bind(job.url.clone())
            .push_bind(i16::from(job.status))
            .push_bind(job.date_applied)
            .push_bind(created_at);
    });
    query
}

/// Repository for job postings stored in Postgres
#[derive(Clone)]
pub struct PgJobRepository {
    pool: Pool<Postgres>,
    clock: Arc<dyn Clock>,
}

impl PgJobRepository {
    pub fn new(pool: Pool<Postgres>, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Move the id sequence past caller-supplied ids so generated ids don't collide
    async fn sync_id_sequence<'e, E>(executor: E) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "SELECT setval(pg_get_serial_sequence('jobs', 'id'), GREATEST((SELECT MAX(id) FROM jobs), 1))",
        )
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn list(
        &self,
        filter: &JobFilter,
        now: NaiveDateTime,
    ) -> Result<Vec<JobRecord>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM jobs", JOB_COLUMNS));
        filter.push_where(&mut query, now);
        query.push(" ORDER BY id");
        debug!("Listing jobs: {}", query.sql());

        let rows = query
            .build_query_as::<JobRecord>()
            .fetch_all(&self.pool)
            .await?;

        debug!("Fetched {} jobs", rows.len());
        Ok(rows)
    }

    async fn get(&self, id: i64) -> Result<Option<JobRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, JobRecord>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn insert(&self, job: &NewJob) -> Result<i64, RepositoryError> {
        debug!("Creating job: title={}, company={}", job.title, job.company);

        let mut tx = self.pool.begin().await?;

        let mut query = insert_statement(std::slice::from_ref(job), self.clock.now());
        query.push(" RETURNING id");
        let id: i64 = query
            .build_query_scalar::<i64>()
            .fetch_one(&mut *tx)
            .await?;

        if job.id.is_some() {
            Self::sync_id_sequence(&mut *tx).await?;
        }

        tx.commit().await?;

        debug!("Job created with id={}", id);
        Ok(id)
    }

    async fn insert_many(&self, jobs: &[NewJob]) -> Result<u64, RepositoryError> {
        if jobs.is_empty() {
            debug!("Bulk create called with empty job list");
            return Ok(0);
        }

        debug!("Starting bulk insert of {} jobs", jobs.len());

        let created_at = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let mut rows_affected = 0;

        for chunk in jobs.chunks(INSERT_CHUNK) {
            let mut query = insert_statement(chunk, created_at);
            rows_affected += query.build().execute(&mut *tx).await?.rows_affected();
        }

        if jobs.iter().any(|job| job.id.is_some()) {
            Self::sync_id_sequence(&mut *tx).await?;
        }

        tx.commit().await?;

        debug!("Bulk insert completed: {} rows inserted", rows_affected);
        Ok(rows_affected)
    }

    async fn update(&self, id: i64, update: &JobUpdate) -> Result<bool, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE jobs SET ");
        {
            let mut fields = query.separated(", ");
            if let Some(title) = &update.title {
                fields.push("title = ").push_bind_unseparated(title.clone());
            }
            if let Some(company) = &update.company {
                fields.push("company = ").push_bind_unseparated(company.clone());
            }
            if let Some(location) = &update.location {
                fields.push("location = ").push_bind_unseparated(location.clone());
            }
            if let Some(date_created) = update.date_created {
                fields.push("date_created = ").push_bind_unseparated(date_created);
            }
            if let Some(description) = &update.description {
                fields.push("description = ").push_bind_unseparated(description.clone());
            }
            if let Some(meta) = &update.meta {
                fields.push("meta = ").push_bind_unseparated(meta.clone());
            }
            if let Some(url) = &update.url {
                fields.push("url = ").push_bind_unseparated(url.clone());
            }
            if let Some(status) = update.status {
                fields.push("status = ").push_bind_unseparated(i16::from(status));
            }
            if let Some(date_applied) = update.date_applied {
                fields.push("date_applied = ").push_bind_unseparated(date_applied);
            }
        }
        query.push(" WHERE id = ").push_bind(id);
        debug!("Updating job {}: {}", id, query.sql());

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, StatusCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 0) AS unprocessed,
                COUNT(*) FILTER (WHERE status = 1) AS rejected,
                COUNT(*) FILTER (WHERE status = 2) AS accepted,
                COUNT(*) FILTER (WHERE status = 3) AS applied,
                COUNT(*) AS total
            FROM jobs
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn applied_per_day(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, i64)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (NaiveDate, i64)>(
            r#"
            SELECT date_applied, COUNT(*)
            FROM jobs
            WHERE date_applied BETWEEN $1 AND $2
            GROUP BY date_applied
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
