use std::process::ExitCode;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use docformat_pipeline::api::{
    health::health_config,
    job::{handlers::job_config, JobService},
    validation,
};
use docformat_pipeline::cli::{self, Cli, Command};
use docformat_pipeline::config::Config;
use docformat_pipeline::db::{self, InMemoryJobLedger, JobLedger, JobRepository};
use docformat_pipeline::queue::{self, JobPublisher};
use docformat_pipeline::shutdown::ShutdownCoordinator;
use docformat_pipeline::storage::{LocalObjectStore, ObjectStore};
use docformat_pipeline::telemetry;
use docformat_pipeline::worker::{requeue_unfinished, Dispatcher, JobConsumer};

#[actix_web::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => match serve().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Service stopped with error: {}", e);
                eprintln!("docformat: {}", e);
                ExitCode::FAILURE
            }
        },
        Command::Format {
            input,
            output,
            profile,
        } => {
            if let Err(e) = telemetry::init_console() {
                eprintln!("docformat: {}", e);
            }
            match cli::run_format(&input, &output, &profile) {
                Ok(summary) => {
                    println!(
                        "Wrote {} ({} characters, text preserved: {})",
                        output.display(),
                        summary.characters,
                        summary.text_preserved
                    );
                    if summary.text_preserved {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(2)
                    }
                }
                Err(e) => {
                    eprintln!("docformat: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Profiles => {
            println!("{}", cli::profile_table());
            ExitCode::SUCCESS
        }
    }
}

async fn serve() -> std::io::Result<()> {
    let config = Config::from_env().map_err(std::io::Error::other)?;
    telemetry::init(&config.log_dir).map_err(std::io::Error::other)?;

    info!("Starting docformat service");
    info!("Configuration loaded successfully:");
    info!("  - Max payload size: {} bytes", config.max_payload_size);
    info!("  - Max concurrent jobs: {}", config.max_concurrent_jobs);
    info!("  - Queue capacity: {}", config.queue_capacity);
    info!("  - Storage root: {}", config.storage_root.display());

    let ledger: Arc<dyn JobLedger> = match &config.database_url {
        Some(database_url) => {
            info!("  - Max database connections: {}", config.max_db_connections);
            let pool = db::connection::get_connection(database_url, config.max_db_connections)
                .await
                .map_err(std::io::Error::other)?;
            info!("Database connection pool established");

            // Run migrations on startup
            db::migrations::run_migrations(&pool)
                .await
                .map_err(std::io::Error::other)?;
            Arc::new(JobRepository::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, jobs are kept in memory and lost on restart");
            Arc::new(InMemoryJobLedger::new())
        }
    };

    let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(
        &config.storage_root,
        &config.storage_bucket,
        &config.public_base_url,
    ));
    let (channel_publisher, receiver) = queue::channel(config.queue_capacity);
    let publisher: Arc<dyn JobPublisher> = Arc::new(channel_publisher);

    // The dispatcher must be draining before anything is republished.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = Arc::new(JobConsumer::new(ledger.clone(), store));
    let dispatcher = Dispatcher::new(consumer, config.max_concurrent_jobs);
    let dispatcher_task = tokio::spawn(dispatcher.run(receiver, shutdown_rx));

    match requeue_unfinished(ledger.as_ref(), publisher.as_ref()).await {
        Ok(count) => info!("Startup recovery republished {} jobs", count),
        Err(e) => error!("Startup recovery failed: {}", e),
    }

    let job_service = web::Data::new(JobService::new(ledger.clone(), publisher));
    let ledger_data: web::Data<dyn JobLedger> = web::Data::from(ledger.clone());
    let max_payload_size = config.max_payload_size;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(job_service.clone())
            .app_data(ledger_data.clone())
            .app_data(web::PayloadConfig::default().limit(max_payload_size))
            .app_data(validation::json_config(max_payload_size))
            .configure(health_config)
            .configure(job_config)
    })
    .disable_signals()
    .bind((config.bind_addr.as_str(), config.port))?
    .run();

    info!("Server listening on http://{}:{}", config.bind_addr, config.port);

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    ShutdownCoordinator::new(server_handle, server_task, dispatcher_task, shutdown_tx, ledger)
        .wait_for_shutdown()
        .await
}
