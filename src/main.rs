mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::db::db::DBClient;
use service::{
    bid_service::BidService, contract_service::ContractService, job_service::JobService,
    notification_service::NotificationService, rating_registry::RatingRegistry,
    timesheet_service::TimesheetService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub notification_service: Arc<NotificationService>,
    pub bid_service: Arc<BidService>,
    pub contract_service: Arc<ContractService>,
    pub job_service: Arc<JobService>,
    pub timesheet_service: Arc<TimesheetService>,
    pub rating_registry: Arc<RatingRegistry>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client_arc = Arc::new(db_client);

        let notification_service = Arc::new(NotificationService::new(
            db_client_arc.clone(),
            config.app_url.clone(),
        ));

        let bid_service = Arc::new(BidService::new(
            db_client_arc.clone(),
            notification_service.clone(),
        ));
        let contract_service = Arc::new(ContractService::new(
            db_client_arc.clone(),
            notification_service.clone(),
        ));
        let job_service = Arc::new(JobService::new(
            db_client_arc.clone(),
            notification_service.clone(),
        ));
        let timesheet_service = Arc::new(TimesheetService::new(
            db_client_arc.clone(),
            notification_service.clone(),
        ));
        let rating_registry = Arc::new(RatingRegistry::new(config.cqc_api_base_url.clone()));

        Self {
            env: config,
            db_client: db_client_arc,
            notification_service,
            bid_service,
            contract_service,
            job_service,
            timesheet_service,
            rating_registry,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);

    let allowed_origins = vec![
        config.app_url.parse::<HeaderValue>().unwrap(),
        "http://localhost:5173".parse::<HeaderValue>().unwrap(),
        "http://localhost:8000".parse::<HeaderValue>().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    service::background_jobs::start_query_expiry_job(app_state.timesheet_service.clone());

    let app = create_router(app_state.clone()).layer(cors);

    tracing::info!("Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .unwrap();
    axum::serve(listener, app).await.unwrap();
}
