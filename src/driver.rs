//! Sequential generate → deliver → pause loop.

use rand::RngCore;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{RunConfig, UnavailablePolicy};
use crate::dispatch::{Outcome, Sink};
use crate::generate::Generator;

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub generated: u32,
    pub delivered: u32,
    pub failed: u32,
    /// Iterations whose sink was unavailable under the skip policy.
    pub skipped: u32,
    /// Inter-iteration pauses taken.
    pub pauses: u32,
    /// The run stopped early because the sink was unavailable.
    pub aborted: bool,
}

impl RunSummary {
    /// Records that actually reached a sink, successfully or not.
    pub fn dispatched(&self) -> u32 {
        self.delivered + self.failed
    }
}

/// Run `config.count` iterations against `sink`.
///
/// Delivery failures never stop the loop. An unavailable sink stops it
/// under [`UnavailablePolicy::Abort`].
pub async fn run_loop(
    config: &RunConfig,
    generator: &Generator,
    sink: &Sink,
    rng: &mut (dyn RngCore + Send),
) -> RunSummary {
    let mut summary = RunSummary::default();

    for i in 0..config.count {
        let record = generator.generate(rng);
        summary.generated += 1;
        debug!(iteration = i + 1, of = config.count, event_type = ?record.event_type(), "generated incident");

        match sink.deliver(&record).await {
            Outcome::Delivered { .. } => summary.delivered += 1,
            Outcome::Failed(_) => summary.failed += 1,
            Outcome::Unavailable { .. } => match config.on_unavailable {
                UnavailablePolicy::Abort => {
                    error!(
                        remaining = config.count - i - 1,
                        "invocation client unavailable, aborting run"
                    );
                    summary.aborted = true;
                    break;
                }
                UnavailablePolicy::Skip => summary.skipped += 1,
            },
        }

        if i + 1 < config.count {
            summary.pauses += 1;
            if !config.delay.is_zero() {
                tokio::time::sleep(config.delay).await;
            }
        }
    }

    info!(
        generated = summary.generated,
        delivered = summary.delivered,
        failed = summary.failed,
        skipped = summary.skipped,
        aborted = summary.aborted,
        "Simulation complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinkConfig;
    use crate::dispatch::InvokeSink;
    use crate::generate::{TemplateRegistry, TemplateSelection};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn invoke_config(count: u32, policy: UnavailablePolicy) -> RunConfig {
        RunConfig {
            count,
            delay: Duration::ZERO,
            template: TemplateSelection::Scenario,
            sink: SinkConfig::Invoke {
                function_name: "alert-normalizer".into(),
                endpoint: None,
                timeout: Duration::from_secs(10),
            },
            on_unavailable: policy,
            seed: Some(1),
        }
    }

    #[tokio::test]
    async fn test_unavailable_client_aborts_before_any_dispatch() {
        let config = invoke_config(5, UnavailablePolicy::Abort);
        let generator = TemplateRegistry::builtin().generator(&config.template).unwrap();
        let sink = Sink::Invoke(InvokeSink::unavailable("alert-normalizer", "no client"));
        let mut rng = StdRng::seed_from_u64(1);

        let summary = run_loop(&config, &generator, &sink, &mut rng).await;
        assert!(summary.aborted);
        assert_eq!(summary.dispatched(), 0);
        assert_eq!(summary.generated, 1);
        assert_eq!(summary.pauses, 0);
    }

    #[tokio::test]
    async fn test_unavailable_client_skip_policy_runs_to_completion() {
        let config = invoke_config(4, UnavailablePolicy::Skip);
        let generator = TemplateRegistry::builtin().generator(&config.template).unwrap();
        let sink = Sink::Invoke(InvokeSink::unavailable("alert-normalizer", "no client"));
        let mut rng = StdRng::seed_from_u64(2);

        let summary = run_loop(&config, &generator, &sink, &mut rng).await;
        assert!(!summary.aborted);
        assert_eq!(summary.skipped, 4);
        assert_eq!(summary.pauses, 3);
        assert_eq!(summary.dispatched(), 0);
    }

    #[tokio::test]
    async fn test_zero_count_does_nothing() {
        let config = invoke_config(0, UnavailablePolicy::Abort);
        let generator = TemplateRegistry::builtin().generator(&config.template).unwrap();
        let sink = Sink::Invoke(InvokeSink::unavailable("alert-normalizer", "no client"));
        let mut rng = StdRng::seed_from_u64(3);

        let summary = run_loop(&config, &generator, &sink, &mut rng).await;
        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_applies_between_iterations_only() {
        let mut config = invoke_config(3, UnavailablePolicy::Skip);
        config.delay = Duration::from_secs(2);
        let generator = TemplateRegistry::builtin().generator(&config.template).unwrap();
        let sink = Sink::Invoke(InvokeSink::unavailable("alert-normalizer", "no client"));
        let mut rng = StdRng::seed_from_u64(4);

        let start = tokio::time::Instant::now();
        let summary = run_loop(&config, &generator, &sink, &mut rng).await;
        assert_eq!(summary.pauses, 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "elapsed {elapsed:?}");
    }
}
