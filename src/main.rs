// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;

use stylist::AppState;
use stylist::config::AppConfig;
use stylist::handlers;
use stylist::services::storage::load_credential;
use stylist::services::{GeminiService, KeyValueStore, MemoryStore, RedisStore};
use stylist::stylist::Stylist;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Stylist service...");

    let config = AppConfig::from_env();

    // Initialize services
    let store: Arc<dyn KeyValueStore> = match RedisStore::new(&config.redis_url).await {
        Ok(redis) => {
            info!("Connected to Redis at {}", config.redis_url);
            Arc::new(redis)
        }
        Err(e) => {
            warn!("Redis unavailable ({}), keeping state in memory only", e);
            Arc::new(MemoryStore::new())
        }
    };

    let api_key = match config.api_key.clone() {
        Some(key) => Some(key),
        None => load_credential(store.as_ref()).await,
    };
    if api_key.is_none() {
        warn!("No API key configured; set GEMINI_API_KEY or PUT /api/v1/credential");
    }

    let gemini = Arc::new(GeminiService::new(
        config.base_url.clone(),
        config.models.clone(),
        api_key,
    ));
    let stylist = Arc::new(
        Stylist::restore(gemini.clone(), store.clone(), config.max_image_dimension).await,
    );

    let app_state = AppState {
        stylist,
        gemini,
        store,
    };

    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(1 << 20))
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("failed to bind {}", config.bind_addr))?
    .run()
    .await
    .context("HTTP server failed")
}
