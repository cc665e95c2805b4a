use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};

use crate::ai_client::{ProviderClient, ProviderSettings};
use crate::config::Config;
use crate::traits::provider::AiProvider;

mod ai_client;
mod config;
mod error;
mod feedback;
mod prompts;
mod service;
mod structs;
mod traits;
mod utils;
mod validator;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 缺少密钥等配置错误时直接退出，不等到请求时才失败
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("FATAL: {}. Application will not start.", e);
            std::process::exit(1);
        }
    };
    log::debug!("Loaded configuration: {:?}", config);

    let client = match ProviderClient::new(ProviderSettings::from(&config.provider)) {
        Ok(client) => client,
        Err(e) => {
            log::error!("FATAL: failed to build provider client: {}", e);
            std::process::exit(1);
        }
    };
    let provider: Arc<dyn AiProvider> = Arc::new(client);
    let provider = web::Data::from(provider);

    let host = config.server.host.clone();
    let port = config.server.port;
    let workers = config.server.workers;
    let max_payload = config.max_payload_bytes();
    let config = web::Data::new(config);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(config.clone())
            .app_data(provider.clone())
            .wrap(Logger::default().exclude("/api/health"))
            .configure(|cfg| service::configure(cfg, max_payload))
    });
    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    log::info!("Starting Math Evaluation API on http://{}:{}", host, port);
    server.bind((host.as_str(), port))?.run().await
}
