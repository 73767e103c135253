use std::sync::Arc;

use room_directory::{
    app,
    config::Config,
    directory::{self, Directory},
    error::AppErr,
    simulator::HttpSimulator,
    store::KvStore,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppErr> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg       = Config::from_env()?;
    let store     = KvStore::connect(&cfg.database_url).await?;
    let simulator = HttpSimulator::new(&cfg.simulator_url, cfg.simulator_timeout)?;

    // 先載入持久化狀態，再開始接受連線
    let dir = Directory::load(store, Arc::new(simulator), (&cfg).into()).await?;
    let (handle, actor) = directory::spawn(dir);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    info!(addr = %cfg.bind_addr, "room directory listening");
    axum::serve(listener, app(handle).into_make_service())
        .with_graceful_shutdown(async { tokio::signal::ctrl_c().await.ok(); })
        .await?;

    actor.abort();
    Ok(())
}
