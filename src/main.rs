use anyhow::{Context, Result};
use solaris::{config, pipeline, telemetry};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("reading .env");
        }
    }
    init_tracing();

    let cfg = Config::load()?;

    if let Some(threads) = cfg.runtime.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configuring worker threads")?;
    }

    info!(threads = rayon::current_num_threads(), "starting Solaris");

    let dataset = pipeline::load_data(&cfg)?;
    let outcome = pipeline::run(&dataset, &cfg)?;

    println!("{}", outcome.report);

    if let Some(path) = &cfg.output.report_json {
        outcome
            .report
            .write_json(path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!(path = %path.display(), "wrote JSON report");
    }

    if let Some(best) = outcome.report.best() {
        if best.method == pipeline::CLIMATOLOGY {
            warn!("climatology beat the trained models on the held-out days");
        }
    }

    info!(
        mae = outcome.ensemble_metrics.mae,
        rmse = outcome.ensemble_metrics.rmse,
        "run complete"
    );
    Ok(())
}
