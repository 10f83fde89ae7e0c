use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info};

use pagetally::config::AppConfig;
use pagetally::db::open_store;
use pagetally::middlewares::cors::cors_policy;
use pagetally::routes::init_routes;
use pagetally::services::visit_aggregator::VisitAggregator;
use pagetally::state::app_state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize the record store
    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("Error connecting to the database: {:#}", e);
            std::process::exit(1);
        }
    };

    let aggregator =
        VisitAggregator::new(store.clone(), config.store_timeout, config.conflict_retries);
    let app_state = web::Data::new(AppState::new(aggregator));
    let allowed_origins = config.allowed_origins.clone();

    info!("Listening on {}:{}", config.host, config.port);
    let server = HttpServer::new(move || {
        let logger = Logger::new("%a \"%r\" %s %b \"%{Referer}i\" \"%{User-Agent}i\" %D ms");
        App::new()
            .wrap(logger)
            .wrap(cors_policy(&allowed_origins))
            .app_data(app_state.clone())
            .configure(init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    store.close().await;
    info!("Shutdown complete");
    server
}
