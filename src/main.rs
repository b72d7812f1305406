use actix_web::{App, HttpServer, middleware, web};

use cdrr_engine::auth::session_middleware;
use cdrr_engine::config::AppConfig;
use cdrr_engine::workflow::WorkflowEngine;
use cdrr_engine::{db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let pool = match db::init_pool(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = db::run_migrations(&pool).await {
        log::error!("Failed to run migrations: {e}");
        std::process::exit(1);
    }

    if let Err(e) = db::seed_admin(&pool, &config.admin).await {
        log::error!("Failed to seed administrator: {e}");
        std::process::exit(1);
    }

    let engine = WorkflowEngine::new(&config.workflow);
    if engine.strict_ordering() {
        log::info!("Strict stage ordering enabled");
    }

    let secret_key = config.cookie_key();
    let bind = (config.server.host.clone(), config.server.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(session_middleware(secret_key.clone()))
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(engine))
            .configure(handlers::configure)
    })
    .bind(bind)?
    .run()
    .await
}
