use std::time::Duration;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use chrono::Local;
use dotenvy::dotenv;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use hrm_engine::config::Config;
use hrm_engine::db::init_db;
use hrm_engine::docs::ApiDoc;
use hrm_engine::engine::adapter::HttpDeviceAdapter;
use hrm_engine::engine::poller::device_sweep;
use hrm_engine::engine::scheduler::{JobTiming, spawn_daily, spawn_repeating};
use hrm_engine::engine::transfer::transfer_sweep;
use hrm_engine::repo::MySqlStore;
use hrm_engine::routes;

#[get("/")]
async fn index() -> impl Responder {
    "Hello World!"
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

    info!("Engine starting...");

    let pool = init_db(&config.database_url).await;
    let store = MySqlStore::new(pool.clone());
    let adapter = HttpDeviceAdapter::new(Duration::from_secs(config.device_http_timeout_secs));

    // Device sweep ticks unconditionally; a tick where no device is due is
    // a no-op, never a reason to stop.
    let sweep_store = store.clone();
    let sweep_adapter = adapter.clone();
    let _device_job = spawn_repeating(
        "device_sweep",
        Duration::from_secs(config.device_poll_minutes * 60),
        move || {
            let store = sweep_store.clone();
            let adapter = sweep_adapter.clone();
            async move {
                let now = Local::now().naive_local();
                device_sweep(&store, &adapter, now).await?;
                Ok(())
            }
        },
    );

    let transfer_store = store.clone();
    let _transfer_job = spawn_daily(
        "transfer_sweep",
        JobTiming {
            execution_hour: config.transfer_exec_hour,
            execution_minute: config.transfer_exec_minute,
            retry_interval: Duration::from_secs(config.transfer_retry_interval_hours * 3600),
        },
        move || {
            let store = transfer_store.clone();
            async move {
                let today = Local::now().date_naive();
                transfer_sweep(&store, today).await?;
                Ok(())
            }
        },
    );

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
