//! Main entry point for the campsite reviews backend server.
//! This crate wires configuration, the database pool and the REST API together.

use std::sync::Arc;

use actix_web::{App, HttpServer, middleware::Logger};
use auth_services::service::AuthService;
use auth_services::store::PgCredentialStore;
use campsite_services::pg::PgCampsiteStore;
use campsite_services::service::Services;
use postgres::database::*;
use web_handlers::routes::{AppData, configure_routes};

mod config;

use config::{Environment, ServerConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Pick the environment before loading its dotenv file
    let environment = Environment::parse(std::env::var("ENV").ok().as_deref())
        .unwrap_or(Environment::Development);
    let dotenv_file = config::load_dotenv(environment);

    // Initialize logger
    env_logger::init_from_env(
        env_logger::Env::new().default_filter_or(environment.default_log_filter()),
    );

    log::info!("🚀 Starting campsite reviews server...");
    if let Some(file) = dotenv_file {
        log::info!("📄 Loaded {}", file);
    }

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    log::debug!(
        "Loaded {} configuration, auth settings: {:?}",
        config.environment,
        config.auth
    );

    // Create database connection pool
    let pool = match create_connection_pool(&config.database_url, config.max_connections).await {
        Ok(pool) => {
            log::info!("🗃️ Database pool created successfully");

            if let Err(e) = test_connection(&pool).await {
                log::error!("❌ Database connection test failed: {}", e);
            }
            pool
        }
        Err(e) => {
            log::error!("❌ Failed to create database pool: {}", e);
            log::error!("💡 Check DATABASE_URL and that PostgreSQL is running");
            std::process::exit(1);
        }
    };

    if config.run_migrations {
        if let Err(e) = run_migrations(&pool).await {
            log::error!("❌ Failed to run database migrations: {}", e);
            std::process::exit(1);
        }
    }

    let auth_service = AuthService::new(Arc::new(PgCredentialStore::new(pool.clone())), &config.auth);
    let services = Services::from_store(Arc::new(PgCampsiteStore::new(pool)));
    let data = AppData::new(auth_service, services);

    log::info!(
        "🌐 Server will be available at: http://{}:{}",
        config.host,
        config.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(|cfg| configure_routes(cfg, &data))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
