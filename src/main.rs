use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod balance;
mod config;
mod error;
mod money;
mod routes;
mod schemas;
mod settlement;
mod split;
mod store;
mod summary;

use crate::config::{CorsSettings, Settings, StorageBackend};
use crate::store::{GroupStore, MemoryStore, MongoStore, StoreError};

#[derive(Debug, Error)]
enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn cors(settings: &CorsSettings) -> Cors {
    match &settings.allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allow_any_method()
            .allow_any_header(),
        None => Cors::permissive(),
    }
}

async fn open_store(settings: &Settings) -> Result<Arc<dyn GroupStore>, StartupError> {
    match settings.storage.backend {
        StorageBackend::Mongodb => {
            let uri = settings.mongodb_uri()?;
            let store = MongoStore::connect(uri, &settings.storage.database).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            info!("using in-memory storage, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "groupsplit=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    let store = open_store(&settings).await?;

    let address = (settings.server.host.clone(), settings.server.port);
    info!(host = %address.0, port = address.1, "starting server");

    let cors_settings = settings.cors.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(&cors_settings))
            .app_data(web::Data::from(store.clone()))
            .configure(routes::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
