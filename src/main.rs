use actix_cors::Cors;
use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod directory;
mod docs;
mod error;
mod ledger;
mod model;
mod routes;

use config::Config;
use db::init_db;
use ledger::AttendanceLedger;

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HRMS Lite API"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    // Lazy pool: the server comes up even if MySQL is down, and requests
    // report 503 until it returns.
    let pool = init_db(&config.database_url);

    let pool_for_bootstrap = pool.clone();
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    // Startup schema work is best-effort: a failure here must never block
    // attendance endpoints, which re-enter the index repair lazily on
    // conflict.
    actix_web::rt::spawn(async move {
        if let Err(e) = db::ping(&pool_for_bootstrap).await {
            warn!(error = %e, "MySQL not reachable at startup; continuing without schema bootstrap");
            return;
        }
        if let Err(e) = db::bootstrap_schema(&pool_for_bootstrap).await {
            warn!(error = %e, "Failed to bootstrap schema");
            return;
        }
        db::ensure_attendance_indexes(&pool_for_bootstrap).await;
        info!("Connected to MySQL");
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            // The API is consumed straight from browsers; any origin may call.
            .wrap(Cors::permissive())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(AttendanceLedger::new(pool.clone())))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
