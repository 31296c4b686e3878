use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use freshness_backend::routes::{UploadLimits, configure_routes};
use freshness_backend::scoring::torch::TorchScriptLoader;
use freshness_backend::{AppConfig, ModelCell, ScoringPipeline};
use std::env;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::load().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let model = Arc::new(ModelCell::new(
        config.model_path(),
        TorchScriptLoader::new(config.model.device),
    ));
    log::info!(
        "Model weights: {} ({:?})",
        model.path().display(),
        config.model.device
    );
    // Requests retry the load, so a missing file only degrades the service.
    match model.preload() {
        Ok(info) => log::info!("Model ready (sha256 {})", info.fingerprint),
        Err(e) => log::warn!("Model not available at startup: {}", e),
    }

    let pipeline = ScoringPipeline::new(model);
    let limits = UploadLimits {
        max_bytes: config.upload.max_bytes,
    };
    let bind_address = config.bind_address();

    log::info!("Starting server on {}", bind_address);

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(pipeline.clone()))
            .configure(|cfg| configure_routes(cfg, limits))
    });
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server.bind(&bind_address)?.run().await
}
