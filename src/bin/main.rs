use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing_subscriber::EnvFilter;

use postline::config;
use postline::core::db::init_demo_data;
use postline::handlers::{configure, AppState};
use postline::{MemoryBlobStore, MemoryStore, PostDistributionService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();

    let service = PostDistributionService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryBlobStore::new()),
    );
    if config::seed_demo_data() {
        init_demo_data(&service).await?;
    }

    let state = web::Data::new(AppState { service });
    let bind = config::bind_address();
    tracing::info!(%bind, "server listening");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(&bind)?
    .run()
    .await?;

    Ok(())
}
