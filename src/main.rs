pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod pages;
pub mod routes;
pub mod scoring;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use log::{error, info};

use crate::inference::Classifier;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("starting credit default scoring service");

    let config = config::AppConfig::from_env();

    // One fetch at startup; a failed load is served as a fixed 500 on the
    // scoring routes rather than retried.
    let classifier: Option<Arc<dyn Classifier>> =
        match inference::load_remote(&config.model_url, config.threshold).await {
            Ok(model) => {
                info!("model loaded from {}", config.model_url);
                Some(Arc::new(model))
            }
            Err(e) => {
                error!("failed to load model from {}: {e}", config.model_url);
                None
            }
        };

    let state = web::Data::new(routes::AppState { classifier });

    let bind_address = config.bind_addr();
    info!("listening on http://{bind_address}");
    info!("workers: {}", config.workers);
    info!("endpoints:");
    info!("  GET  /               - scoring form");
    info!("  POST /predict        - score a borrower");
    info!("  GET  /api/health     - health check");
    info!("  GET  /api/model-info - model information");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(cors)
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .workers(config.workers)
    .bind(&bind_address)?
    .run()
    .await
}
