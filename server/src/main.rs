mod config;
mod error;
mod routes;

use actix_web::{middleware::Logger, web, App, HttpServer};
use sahabat_shared::MemoryStore;

use crate::config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|err| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
    })?;
    let store = web::Data::new(MemoryStore::new());

    log::info!("serving document store on {}", config.bind);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(store.clone())
            .configure(routes::configure)
    })
    .bind(config.bind)?
    .run()
    .await
}
