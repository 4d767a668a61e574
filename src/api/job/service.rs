use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::{Validate, ValidationErrors};

use crate::api::stats::{StatisticsSnapshot, StatsAggregator};
use crate::api::validation::ErrorResponse;
use crate::clock::Clock;
use crate::db::filter::{JobFilter, JobQuery};
use crate::db::models::JobRecord;
use crate::db::repository::{JobRepository, RepositoryError};
use super::dto::{BulkJobResponse, JobAck, JobError};
use super::models::{JobUpdate, NewJob};

/// Service-level errors
#[derive(Debug)]
pub enum ServiceError {
    /// Storage operation failed
    Storage(RepositoryError),

    /// Request payload failed validation
    Validation(String),

    /// Path id is not an integer
    InvalidId(String),

    /// Job not found
    NotFound(i64),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Storage(e) => write!(f, "{}", e),
            ServiceError::Validation(msg) => write!(f, "{}", msg),
            ServiceError::InvalidId(raw) => write!(f, "Invalid job ID: {:?}", raw),
            ServiceError::NotFound(id) => write!(f, "Job not found: {}", id),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<RepositoryError> for ServiceError {
    fn from(e: RepositoryError) -> Self {
        ServiceError::Storage(e)
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Validation(_) | ServiceError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Storage(e) => {
                // Internal tool: the raw storage message goes back to the caller
                error!("Storage error: {}", e);
                HttpResponse::InternalServerError().json(ErrorResponse::new(e.to_string()))
            }
            ServiceError::Validation(msg) => {
                warn!("Validation error: {}", msg);
                HttpResponse::BadRequest().json(ErrorResponse::new(msg.clone()))
            }
            ServiceError::InvalidId(raw) => {
                warn!("Invalid job id: {:?}", raw);
                HttpResponse::BadRequest().json(ErrorResponse::new("Invalid job ID"))
            }
            ServiceError::NotFound(id) => {
                warn!("Job not found: {}", id);
                HttpResponse::NotFound().json(ErrorResponse::new("Job not found"))
            }
        }
    }
}

/// Parse a job id from a path segment
pub fn parse_job_id(raw: &str) -> Result<i64, ServiceError> {
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::InvalidId(raw.to_string()))
}

fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation error in field: {}", field))
            })
        })
        .collect()
}

/// Job service containing business logic
pub struct JobService {
    repo: Arc<dyn JobRepository>,
    clock: Arc<dyn Clock>,
}

impl JobService {
    /// Create a new JobService instance
    pub fn new(repo: Arc<dyn JobRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// List jobs matching the valid parts of `query`
    ///
    /// Unparseable filter values are dropped, never reported.
    pub async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>, ServiceError> {
        let filter = JobFilter::parse(query);
        if filter.is_unfiltered() && *query != JobQuery::default() {
            info!("Service: ignoring invalid job filter {:?}", query);
        }

        let jobs = self.repo.list(&filter, self.clock.now()).await?;
        info!("Service: listed {} jobs for {:?}", jobs.len(), filter);
        Ok(jobs)
    }

    pub async fn get_job(&self, id: i64) -> Result<JobRecord, ServiceError> {
        self.repo.get(id).await?.ok_or(ServiceError::NotFound(id))
    }

    /// Create a single job
    ///
    /// # Returns
    /// - `Ok(JobAck)` - Job created, with the id storage assigned or the caller supplied
    /// - `Err(ServiceError)` - Validation or storage failure
    pub async fn create_job(&self, job: &NewJob) -> Result<JobAck, ServiceError> {
        if job.validate().is_err() {
            return Err(ServiceError::Validation(
                "Title and company are required fields".to_string(),
            ));
        }

        info!("Service: Creating job title={}, company={}", job.title, job.company);
        let id = self.repo.insert(job).await?;
        info!("Service: Job created successfully with id={}", id);

        Ok(JobAck::new("Job created successfully", id))
    }

    /// Bulk create jobs from an uploaded file
    ///
    /// # Business Logic
    /// - Validates each job individually
    /// - Collects validation errors keyed by job title
    /// - Bulk inserts only valid jobs
    /// - Returns summary with created count and errors
    pub async fn bulk_create_jobs(&self, jobs: Vec<NewJob>) -> Result<BulkJobResponse, ServiceError> {
        info!("Service: Processing bulk job creation for {} jobs", jobs.len());

        let mut valid_jobs = Vec::new();
        let mut errors = Vec::new();

        for (index, job) in jobs.into_iter().enumerate() {
            match job.validate() {
                Ok(()) => valid_jobs.push(job),
                Err(validation_errors) => {
                    let name = if job.title.is_empty() {
                        format!("#{}", index)
                    } else {
                        job.title.clone()
                    };
                    warn!("Service: Validation failed for job: {}", name);
                    errors.push(JobError {
                        name,
                        errors: validation_messages(&validation_errors),
                    });
                }
            }
        }

        let created = if valid_jobs.is_empty() {
            warn!("Service: No valid jobs to insert");
            0
        } else {
            info!("Service: Bulk inserting {} valid jobs", valid_jobs.len());
            self.repo.insert_many(&valid_jobs).await? as usize
        };

        let error_count = errors.len();
        if error_count == 0 {
            info!("Service: Bulk job creation completed successfully: {} jobs created", created);
        } else {
            warn!("Service: Bulk job creation completed with {} validation errors", error_count);
        }

        Ok(BulkJobResponse {
            message: format!(
                "Bulk job creation completed. {} created, {} failed",
                created, error_count
            ),
            created,
            errors,
        })
    }

    /// Apply a partial update to a job
    pub async fn update_job(&self, id: i64, update: &JobUpdate) -> Result<JobAck, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::Validation(
                "No valid job fields provided for update".to_string(),
            ));
        }
        if let Err(errors) = update.validate() {
            return Err(ServiceError::Validation(validation_messages(&errors).join(", ")));
        }

        if !self.repo.update(id, update).await? {
            return Err(ServiceError::NotFound(id));
        }

        info!("Service: Job {} updated", id);
        Ok(JobAck::new("Job updated successfully", id))
    }

    pub async fn delete_job(&self, id: i64) -> Result<JobAck, ServiceError> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound(id));
        }

        info!("Service: Job {} deleted", id);
        Ok(JobAck::new("Job deleted successfully", id))
    }

    /// Dashboard statistics as of the clock's current date
    pub async fn statistics(&self) -> Result<StatisticsSnapshot, ServiceError> {
        let snapshot = StatsAggregator::snapshot(self.repo.as_ref(), self.clock.today()).await?;
        Ok(snapshot)
    }

    /// Storage connectivity check for health probes
    pub async fn ping(&self) -> Result<(), ServiceError> {
        self.repo.ping().await?;
        Ok(())
    }

    /// Release storage resources
    pub async fn close(&self) {
        self.repo.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::memory::MemoryJobRepository;
    use crate::db::models::JobStatus;
    use actix_web::body::to_bytes;
    use chrono::NaiveDate;

    fn service() -> JobService {
        let clock: Arc<dyn Clock> =
            Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()));
        JobService::new(Arc::new(MemoryJobRepository::new(clock.clone())), clock)
    }

    #[test]
    fn parse_job_id_rejects_non_numeric() {
        assert_eq!(parse_job_id("42").unwrap(), 42);
        assert!(matches!(parse_job_id("abc"), Err(ServiceError::InvalidId(_))));
    }

    #[actix_web::test]
    async fn not_found_renders_404_body() {
        let response = ServiceError::NotFound(3).error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"Job not found"}"#);
    }

    #[actix_web::test]
    async fn storage_error_surfaces_raw_message() {
        let response = ServiceError::Storage(RepositoryError::DuplicateId(9)).error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body()).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("(id)=(9)"));
    }

    #[actix_web::test]
    async fn create_rejects_blank_title() {
        let err = service().create_job(&NewJob::new("", "Acme")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[actix_web::test]
    async fn empty_update_is_a_validation_error() {
        let service = service();
        let ack = service.create_job(&NewJob::new("Dev", "Acme")).await.unwrap();
        let err = service
            .update_job(ack.job_id, &JobUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[actix_web::test]
    async fn update_missing_job_is_not_found() {
        let update = JobUpdate::status_change(JobStatus::Rejected, None);
        let err = service().update_job(5, &update).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(5)));
    }

    #[actix_web::test]
    async fn bulk_create_inserts_valid_and_reports_invalid() {
        let service = service();
        let jobs = vec![
            NewJob::new("Dev", "Acme"),
            NewJob::new("", "Acme"),
            NewJob::new("Ops", ""),
        ];

        let response = service.bulk_create_jobs(jobs).await.unwrap();

        assert_eq!(response.created, 1);
        assert_eq!(response.errors.len(), 2);
        assert_eq!(response.errors[0].name, "#1");
        assert_eq!(response.errors[1].name, "Ops");
        assert_eq!(service.statistics().await.unwrap().counts.total, 1);
    }
}
