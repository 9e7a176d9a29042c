//! Runs the five-task admission simulation and prints the grant timeline.
//!
//! Capacities come from `ADMISSION_*` environment variables (or a `.env`
//! file); when none of the capacity variables is set the controller gets two
//! units of every resource. Malformed settings abort the run.
//! `ADMISSION_WORK_MS` sets how long each task holds its grant.

use std::time::Duration;

use anyhow::Context as _;
use prometheus_admission::builders::ControllerBuilder;
use prometheus_admission::config::ControllerConfig;
use prometheus_admission::core::AppResult;
use prometheus_admission::runtime::{demo_jobs, run_simulation, SleepWork};
use prometheus_admission::util::init_tracing;

const DEFAULT_WORK_MS: u64 = 2000;
const DEFAULT_CAPACITY: u32 = 2;

#[tokio::main]
async fn main() -> AppResult<()> {
    init_tracing();

    let config = ControllerConfig::from_env_with_default_capacity(DEFAULT_CAPACITY)
        .map_err(|reason| anyhow::anyhow!("invalid configuration: {reason}"))?;
    let work_ms = match std::env::var("ADMISSION_WORK_MS") {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("ADMISSION_WORK_MS={raw:?} is not a number"))?,
        Err(_) => DEFAULT_WORK_MS,
    };

    let controller = ControllerBuilder::new(config).build()?;
    let timeline = run_simulation(
        &controller,
        demo_jobs(),
        SleepWork::new(Duration::from_millis(work_ms)),
    )
    .await?;

    for event in &timeline {
        println!(
            "{:>14} {:<6} {:?} (request {:?})",
            event.at_ms, event.job, event.phase, event.request_id
        );
    }
    let snapshot = controller.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
