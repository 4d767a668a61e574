use std::io;
use std::sync::Arc;

use actix_multipart::form::MultipartFormConfig;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use tracing::info;

use job_tracker::api::{self, cors, job::JobService, validation};
use job_tracker::cli::{self, Cli, Command};
use job_tracker::clock::{Clock, SystemClock};
use job_tracker::config::Config;
use job_tracker::db::{self, JobQuery, JobRepository, MemoryJobRepository, PgJobRepository};
use job_tracker::shutdown::ShutdownCoordinator;
use job_tracker::telemetry;
use job_tracker::triage::{HttpJobPersistence, JobPersistence};

fn config_error(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

async fn connect(config: &Config) -> io::Result<sqlx::PgPool> {
    let database_url = config.require_database_url().map_err(config_error)?;
    let pool = db::connection::get_connection(database_url, config.max_db_connections)
        .await
        .map_err(io::Error::other)?;
    info!("Database connection pool established");
    Ok(pool)
}

async fn build_repository(
    config: &Config,
    memory: bool,
    clock: Arc<dyn Clock>,
) -> io::Result<Arc<dyn JobRepository>> {
    if memory {
        info!("Using in-memory job storage; nothing will be persisted");
        return Ok(Arc::new(MemoryJobRepository::new(clock)));
    }

    let pool = connect(config).await?;
    // Auto-migrate when starting against Postgres
    db::migrations::run_migrations(&pool)
        .await
        .map_err(io::Error::other)?;
    Ok(Arc::new(PgJobRepository::new(pool, clock)))
}

async fn serve(config: Config, service: Arc<JobService>) -> io::Result<()> {
    let Config {
        host,
        port,
        max_payload_size,
        cors_allowed_origins,
        ..
    } = config;

    let server_service = web::Data::from(Arc::clone(&service));

    let server = HttpServer::new(move || {
        // Configure payload size limits globally
        let payload_config = web::PayloadConfig::default().limit(max_payload_size);

        let multipart_config = MultipartFormConfig::default().total_limit(max_payload_size);

        App::new()
            .wrap(cors::build_cors(&cors_allowed_origins))
            .app_data(server_service.clone())
            .app_data(payload_config)
            .app_data(multipart_config)
            .app_data(validation::json_config(max_payload_size))
            .configure(api::routes)
    });

    info!("Server starting on http://{}:{}", host, port);

    let server = server.bind((host.as_str(), port))?.run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    ShutdownCoordinator::new(server_handle, server_task, service)
        .wait_for_shutdown()
        .await
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve);

    // Load configuration from environment
    let config = Config::from_env().map_err(config_error)?;

    telemetry::init(&config.log_dir, command.is_triage())?;

    info!("Starting job-tracker application");
    info!("Configuration loaded successfully:");
    info!("  - Max payload size: {} bytes", config.max_payload_size);
    info!("  - Max database connections: {}", config.max_db_connections);

    if let Command::Migrate = command {
        let pool = connect(&config).await?;
        db::migrations::run_migrations(&pool)
            .await
            .map_err(io::Error::other)?;
        pool.close().await;
        return Ok(());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if let Command::Triage {
        status,
        days,
        id,
        server: Some(server),
    } = &command
    {
        info!("Triaging against {}", server);
        let persistence = HttpJobPersistence::new(server).map_err(io::Error::other)?;
        let query = JobQuery {
            id: id.clone(),
            status: status.clone(),
            days: days.clone(),
        };
        return cli::run_triage(Arc::new(persistence), clock, query).await;
    }

    if cli.memory && command.is_triage() {
        return Err(config_error(
            "triage --memory would start from an empty store; pass --server to triage a running server"
                .to_string(),
        ));
    }

    let repo = build_repository(&config, cli.memory, Arc::clone(&clock)).await?;
    let service = Arc::new(JobService::new(repo, Arc::clone(&clock)));

    match command {
        Command::Triage { status, days, id, .. } => {
            let query = JobQuery { id, status, days };
            let persistence: Arc<dyn JobPersistence> = service.clone();
            let result = cli::run_triage(persistence, clock, query).await;
            service.close().await;
            result
        }
        _ => serve(config, service).await,
    }
}
