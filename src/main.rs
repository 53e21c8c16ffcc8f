use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod store;
mod workflow;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::store::mysql::MySqlStore;
use crate::workflow::clock::SystemClock;
use crate::workflow::directory::DirectoryCache;
use crate::workflow::notify::LogNotifier;
use crate::workflow::{LeavePolicy, Workflow, absence_sweep};
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HRM leave service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;
    let store = MySqlStore::new(pool);
    store.migrate().await.context("Failed to apply migrations")?;

    let clock = SystemClock::with_offset_minutes(config.business_utc_offset_minutes)
        .context("BUSINESS_UTC_OFFSET_MINUTES is out of range")?;
    let workflow = Data::new(Workflow::new(
        store,
        DirectoryCache::new(config.directory_cache_ttl),
        Arc::new(LogNotifier),
        Arc::new(clock),
        LeavePolicy::from_config(&config),
    ));

    if config.absence_sweep_enabled {
        let scheduled = workflow.clone().into_inner();
        let at = config.absence_sweep_at;
        actix_web::rt::spawn(absence_sweep::run_absence_scheduler(scheduled, at));
    }

    let limiters = Limiters::from_config(&config)?;
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(workflow.clone())
            .app_data(Data::new(config.clone()))
            .service(index)
            // Protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
