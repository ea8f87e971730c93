mod classifier;
mod config;
mod handlers;
mod models;
mod weights;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;

use classifier::Classifier;
use config::Config;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().context("invalid configuration")?;

    // The listener must not open until the classifier is ready, so the
    // download and model load happen before the bind.
    weights::ensure_weights(
        &config.weights_url,
        &config.weights_path,
        config.weights_sha256.as_deref(),
    )
    .await
    .context("failed to fetch model weights")?;

    let classifier = web::Data::new(
        Classifier::load(&config.weights_path).context("failed to load model")?,
    );

    log::info!("Server running at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(classifier.clone())
            .service(web::resource("/").route(web::get().to(handlers::index)))
            .service(web::resource("/analyze").route(web::post().to(handlers::analyze)))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
