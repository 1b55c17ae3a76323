use std::io;
use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{web, HttpServer};
use dotenv::dotenv;
use log::{info, warn};

mod access;
mod config;
mod error;
mod models;
mod response;
mod routes;
mod session;
mod state;
mod store;
mod validation;

#[cfg(test)]
mod test_support;

use config::AppConfig;
use state::AppState;
use store::{MemoryStore, MySqlStore, Store};

async fn open_store(config: &AppConfig) -> io::Result<Arc<dyn Store>> {
    let Some(url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL is not set; using the in-memory store, data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let store = MySqlStore::connect(url, config.max_connections)
        .await
        .map_err(io::Error::other)?;
    store.initialize().await.map_err(io::Error::other)?;
    info!("Connected to MySQL with {} pooled connections", config.max_connections);
    Ok(Arc::new(store))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(io::Error::other)?;
    let store = open_store(&config).await?;
    let bind_address = (config.host.clone(), config.port);
    let state = web::Data::new(AppState::new(store, config));

    info!("Server running at http://{}:{}", bind_address.0, bind_address.1);
    info!("Environment: {}", state.config.environment);

    HttpServer::new(move || routes::build_app(state.clone()).wrap(Logger::default()))
        .bind(bind_address)?
        .run()
        .await
}
