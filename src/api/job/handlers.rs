use actix_multipart::form::{bytes::Bytes, MultipartForm};
use actix_web::{
    delete, get, post, put, HttpResponse,
    web::{Data, Path, Query, ServiceConfig, scope},
};
use actix_web_validator::Json;

use crate::db::filter::JobQuery;
use super::models::{JobUpdate, NewJob};
use super::service::{JobService, ServiceError, parse_job_id};

/// Multipart upload carrying a JSON array of jobs in the `file` field
#[derive(MultipartForm)]
pub struct ImportForm {
    pub file: Bytes,
}

#[get("")]
async fn list_jobs(
    service: Data<JobService>,
    query: Query<Vec<(String, String)>>,
) -> Result<HttpResponse, ServiceError> {
    let query = JobQuery::from_pairs(query.into_inner());
    let jobs = service.list_jobs(&query).await?;
    Ok(HttpResponse::Ok().json(jobs))
}

#[get("/{id}")]
async fn get_job(
    service: Data<JobService>,
    path: Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_job_id(&path)?;
    let job = service.get_job(id).await?;
    Ok(HttpResponse::Ok().json(job))
}

#[post("")]
async fn create_job(
    service: Data<JobService>,
    job: Json<NewJob>,
) -> Result<HttpResponse, ServiceError> {
    let ack = service.create_job(&job).await?;
    Ok(HttpResponse::Created().json(ack))
}

#[post("/import")]
async fn import_jobs(
    service: Data<JobService>,
    MultipartForm(form): MultipartForm<ImportForm>,
) -> Result<HttpResponse, ServiceError> {
    let jobs: Vec<NewJob> = serde_json::from_slice(&form.file.data).map_err(|e| {
        ServiceError::Validation(format!("Uploaded file is not a JSON array of jobs: {}", e))
    })?;

    let response = service.bulk_create_jobs(jobs).await?;
    Ok(HttpResponse::Created().json(response))
}

#[put("/{id}")]
async fn update_job(
    service: Data<JobService>,
    path: Path<String>,
    update: Json<JobUpdate>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_job_id(&path)?;
    let ack = service.update_job(id, &update).await?;
    Ok(HttpResponse::Ok().json(ack))
}

#[delete("/{id}")]
async fn delete_job(
    service: Data<JobService>,
    path: Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = parse_job_id(&path)?;
    let ack = service.delete_job(id).await?;
    Ok(HttpResponse::Ok().json(ack))
}

pub fn job_config(config: &mut ServiceConfig) {
    config.service(
        scope("jobs")
            .service(list_jobs)
            .service(create_job)
            .service(import_jobs)
            .service(get_job)
            .service(update_job)
            .service(delete_job),
    );
}
