//! incidentsim -- synthetic incident generator for alert ingestion pipelines.
//!
//! Generates randomized incident records from a registry of templates and
//! delivers them to an HTTP endpoint or a directly invoked function, one at
//! a time, with a configurable pause between sends.

pub mod config;
pub mod dispatch;
pub mod driver;
pub mod generate;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::RunConfig;
use crate::dispatch::Sink;
use crate::driver::RunSummary;
use crate::generate::{IncidentRecord, TemplateRegistry, TemplateSelection};

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Run a simulation with the built-in templates.
pub async fn run(config: &RunConfig) -> Result<RunSummary> {
    run_with_registry(config, &TemplateRegistry::builtin()).await
}

/// Run a simulation drawing from a caller-supplied registry.
pub async fn run_with_registry(config: &RunConfig, registry: &TemplateRegistry) -> Result<RunSummary> {
    let generator = registry
        .generator(&config.template)
        .context("invalid template selection")?;
    let sink = Sink::from_config(&config.sink).context("failed to set up delivery sink")?;

    tracing::info!(
        sink = sink.kind(),
        target = %sink.target(),
        count = config.count,
        delay_secs = config.delay.as_secs_f64(),
        templates = ?generator.template_names(),
        "Starting incident simulation"
    );

    let mut rng = seeded_rng(config.seed);
    Ok(driver::run_loop(config, &generator, &sink, &mut rng).await)
}

/// Generate `count` records without sending them.
pub fn generate_records(
    selection: &TemplateSelection,
    count: usize,
    seed: Option<u64>,
) -> Result<Vec<IncidentRecord>> {
    let generator = TemplateRegistry::builtin()
        .generator(selection)
        .context("invalid template selection")?;
    let mut rng = seeded_rng(seed);
    Ok((0..count).map(|_| generator.generate(&mut rng)).collect())
}
