use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpServer};
use chrono::NaiveDate;

use job_tracker::api::job::models::{JobUpdate, NewJob};
use job_tracker::api::{self, job::JobService, validation};
use job_tracker::clock::{Clock, FixedClock};
use job_tracker::db::models::{JobRecord, JobStatus};
use job_tracker::db::{JobQuery, JobRepository, MemoryJobRepository};
use job_tracker::triage::{
    HttpJobPersistence, JobPersistence, SyncBridge, TriageKey, TriageStateMachine,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn record(id: i64, status: JobStatus) -> JobRecord {
    let mut job = NewJob::new(format!("Job {}", id), "Acme")
        .into_record(id, today().and_hms_opt(9, 0, 0).unwrap());
    job.status = status;
    job
}

/// Serve the API on an ephemeral port, returning its root URL
fn start_server(service: Arc<JobService>) -> (String, ServerHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let data = web::Data::from(service);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .app_data(validation::json_config(1024 * 1024))
            .configure(api::routes)
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();

    let handle = server.handle();
    actix_web::rt::spawn(server);
    (format!("http://{}/", addr), handle)
}

fn backend(jobs: Vec<JobRecord>) -> (MemoryJobRepository, Arc<JobService>, Arc<dyn Clock>) {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::on(today()));
    let repo = MemoryJobRepository::new(Arc::clone(&clock));
    repo.seed(jobs);
    let service = Arc::new(JobService::new(Arc::new(repo.clone()), Arc::clone(&clock)));
    (repo, service, clock)
}

#[actix_web::test]
async fn fetch_sends_filter_as_query_string() {
    let (_repo, service, _clock) = backend(vec![
        record(1, JobStatus::Unprocessed),
        record(2, JobStatus::Rejected),
        record(3, JobStatus::Applied),
    ]);
    let (url, handle) = start_server(service);
    let persistence = HttpJobPersistence::new(&url).unwrap();

    let jobs = persistence
        .fetch_jobs(&JobQuery::with_status("1,3"))
        .await
        .unwrap();

    let ids: Vec<i64> = jobs.iter().map(|job| job.id).collect();
    assert_eq!(ids, vec![2, 3]);
    assert_eq!(jobs[1].status, JobStatus::Applied);

    handle.stop(true).await;
}

#[actix_web::test]
async fn update_puts_only_the_sent_fields() {
    let mut job = record(4, JobStatus::Unprocessed);
    job.location = Some("Berlin".to_string());
    let (repo, service, _clock) = backend(vec![job]);
    let (url, handle) = start_server(service);
    let persistence = HttpJobPersistence::new(&url).unwrap();

    persistence
        .update_job(4, &JobUpdate::status_change(JobStatus::Applied, Some(today())))
        .await
        .unwrap();

    let stored = repo.get(4).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Applied);
    assert_eq!(stored.date_applied, Some(today()));
    assert_eq!(stored.location.as_deref(), Some("Berlin"));

    handle.stop(true).await;
}

#[actix_web::test]
async fn update_of_missing_job_is_an_error() {
    let (_repo, service, _clock) = backend(Vec::new());
    let (url, handle) = start_server(service);
    let persistence = HttpJobPersistence::new(&url).unwrap();

    let result = persistence
        .update_job(99, &JobUpdate::status_change(JobStatus::Rejected, None))
        .await;
    assert!(result.is_err());

    handle.stop(true).await;
}

#[actix_web::test]
async fn triage_over_http_persists_accept() {
    let (repo, service, clock) = backend(vec![
        record(1, JobStatus::Unprocessed),
        record(2, JobStatus::Unprocessed),
        record(3, JobStatus::Unprocessed),
    ]);
    let (url, handle) = start_server(service);
    let persistence = Arc::new(HttpJobPersistence::new(&url).unwrap());
    let mut machine = TriageStateMachine::new(SyncBridge::new(persistence), clock);

    machine.refresh(&JobQuery::default()).await.unwrap();
    let transition = machine.handle(TriageKey::Accept).unwrap();

    assert_eq!(transition.active, 2);
    assert_eq!(machine.store().get(1).unwrap().status, JobStatus::Accepted);

    machine.settle().await;
    let stored = repo.get(1).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Accepted);
    assert_eq!(stored.date_applied, None);
    assert_eq!(repo.get(2).await.unwrap().unwrap().status, JobStatus::Unprocessed);

    handle.stop(true).await;
}
