use actix_web::{HttpResponse, get, web};

use crate::api::job::{JobService, ServiceError};

/// Status counts plus the trailing 30-day applied series
#[get("/statistics")]
async fn statistics(service: web::Data<JobService>) -> Result<HttpResponse, ServiceError> {
    let snapshot = service.statistics().await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

pub fn stats_config(config: &mut web::ServiceConfig) {
    config.service(statistics);
}
