//! Run every configured source once and exit. Non-zero exit when any source
//! failed.

use anyhow::{bail, Result};
use energy_sync::{app::App, config::AppConfig, observability};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let app = App::build(&cfg).await?;

    let outcomes = app.scheduler.run_once().await;

    let mut failed = 0usize;
    for (src, outcome) in cfg.sources.iter().zip(&outcomes) {
        match outcome {
            Ok(summary) => println!(
                "{}: fetched={} persisted={} failed={} cached={}",
                summary.building, summary.fetched, summary.persisted, summary.failed, summary.cached
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {e}", src.building);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} sources failed", outcomes.len());
    }
    Ok(())
}
