use actix_web::web;

pub mod cors;
pub mod health;
pub mod job;
pub mod stats;
pub mod validation;

/// Register every HTTP route of the service
pub fn routes(config: &mut web::ServiceConfig) {
    config
        .configure(health::health_config)
        .configure(stats::handlers::stats_config)
        .configure(job::handlers::job_config);
}
