use std::future::IntoFuture;

use anyhow::{Context, Result};
use energy_sync::{api, app::App, config::AppConfig, metrics_server, observability};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let App { scheduler, state } = App::build(&cfg).await?;
    let sync = scheduler.spawn();

    match &cfg.api {
        Some(api_cfg) => {
            let listener = tokio::net::TcpListener::bind(&api_cfg.bind_addr)
                .await
                .with_context(|| format!("failed to bind api listener on {}", api_cfg.bind_addr))?;
            tracing::info!(addr = %api_cfg.bind_addr, "serving energy api");

            let app = api::router(state);
            tokio::select! {
                res = axum::serve(listener, app.into_make_service()).into_future() => res.context("api server error")?,
                res = sync => res.context("scheduler task stopped")?,
            }
        }
        None => {
            tracing::info!("no [api] section configured, running scheduler only");
            sync.await.context("scheduler task stopped")?;
        }
    }

    Ok(())
}
