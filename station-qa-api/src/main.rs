use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use station_qa_api::config::ApiConfig;
use station_qa_api::handlers;
use station_qa_api::helpers::{database::initialize_database, llm::create_llm_client};
use station_qa_api::qa::handler::{QaHandler, QaSettings};
use station_qa_api::storage::SqliteConversationStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "station-qa-api", about = "Power-station Q&A API server")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address, e.g. 0.0.0.0:8899
    #[arg(short, long)]
    bind: Option<String>,
}

fn init_tracing(config: &ApiConfig) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = config
        .logging
        .as_ref()
        .and_then(|logging| logging.directory.clone());

    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "station-qa-api.log");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer())
                .init();
            None
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (config, config_path) = match &args.config {
        Some(path) => ApiConfig::load_from(path)?,
        None => ApiConfig::load()?,
    };

    let _log_guard = init_tracing(&config);
    info!(config = %config_path.display(), "Loaded configuration");

    let pool = initialize_database(&config.database)?;
    let store = Arc::new(SqliteConversationStore::new(pool));
    let llm_client = create_llm_client(&config.llm)?;
    let qa_handler = QaHandler::new(store, llm_client, QaSettings::from_config(&config));

    let bind_addr = args
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));
    info!(
        model = %config.llm.model,
        ollama = %config.llm.base_url,
        "Starting station-qa-api server at http://{}",
        bind_addr
    );

    let qa_handler = web::Data::new(qa_handler);
    let qa_config = web::Data::new(config.qa.clone());
    let allowed_origins = config
        .cors
        .as_ref()
        .map(|cors| cors.allowed_origins.clone())
        .unwrap_or_default();

    HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(Logger::new("%r %s %Dms"))
            .app_data(qa_handler.clone())
            .app_data(qa_config.clone())
            .service(handlers::health::health)
            .configure(handlers::qa::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
