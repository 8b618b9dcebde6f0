use std::{future::Future, net::SocketAddr};

use axum::Router;
use common::utils::logging::init_logging;
use configs::AppConfig;
use dotenvy::dotenv;
use migration::MigratorTrait;
use tokio::net::TcpListener;
use tracing::info;

use crate::routes;
use crate::state::AppState;
use service::payment::GatewayRegistry;

/// Open the database, apply pending migrations and assemble shared state.
pub async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    common::env::ensure_sqlite_dir(&config.database.url).await?;
    let db = models::db::connect_with_config(&config.database).await?;
    migration::Migrator::up(&db, None).await?;
    info!("database migrations applied");
    Ok(AppState::new(db, config, GatewayRegistry::mock_all())?)
}

/// State plus router, ready to serve.
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    let state = build_state(config).await?;
    Ok(routes::build_router(state))
}

fn bind_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", config.server.host, config.server.port).parse()?)
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

/// Public entry: load config, build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let config = AppConfig::load_and_validate()?;
    init_logging(&config.logging.format);

    let addr = bind_addr(&config)?;
    let app = build_app(config).await?;

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "starting membership server");
    serve(listener, app, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received, draining connections");
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_from_config() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "0.0.0.0".into();
        cfg.server.port = 9090;
        assert_eq!(bind_addr(&cfg).unwrap().port(), 9090);
        cfg.server.host = "not a host".into();
        assert!(bind_addr(&cfg).is_err());
    }
}
