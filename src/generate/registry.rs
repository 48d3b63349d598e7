//! Named template registry and selection.

use std::str::FromStr;
use std::sync::Arc;

use rand::{Rng, RngCore};

use super::metric::MetricTemplate;
use super::scenario::{ApiError, CpuSpike, CrashLoop, DbLatency, DnsFailure};
use super::{IncidentRecord, Template, TemplateError};

/// Which template(s) the generator draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSelection {
    /// The generic metric template only.
    Generic,
    /// Uniform over all scenario templates.
    Scenario,
    /// Uniform over every registered template.
    Any,
    /// A single template by name.
    Named(String),
}

impl FromStr for TemplateSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "generic" | "metric" => TemplateSelection::Generic,
            "scenario" | "scenarios" => TemplateSelection::Scenario,
            "any" | "all" => TemplateSelection::Any,
            other => TemplateSelection::Named(other.to_string()),
        })
    }
}

impl std::fmt::Display for TemplateSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateSelection::Generic => write!(f, "generic"),
            TemplateSelection::Scenario => write!(f, "scenario"),
            TemplateSelection::Any => write!(f, "any"),
            TemplateSelection::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Ordered set of named templates.
#[derive(Clone, Default)]
pub struct TemplateRegistry {
    templates: Vec<Arc<dyn Template>>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the generic template and the five scenarios.
    pub fn builtin() -> Self {
        Self {
            templates: vec![
                Arc::new(MetricTemplate),
                Arc::new(CpuSpike),
                Arc::new(CrashLoop),
                Arc::new(ApiError),
                Arc::new(DbLatency),
                Arc::new(DnsFailure),
            ],
        }
    }

    pub fn register(&mut self, template: Arc<dyn Template>) -> Result<(), TemplateError> {
        if self.get(template.name()).is_some() {
            return Err(TemplateError::Duplicate {
                name: template.name().to_string(),
            });
        }
        self.templates.push(template);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Template>> {
        self.templates.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.templates.iter().map(|t| t.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Template>> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Resolve a selection to its candidate templates.
    ///
    /// Fails on an unknown name or an empty candidate set so configuration
    /// mistakes surface before the run starts.
    pub fn candidates(
        &self,
        selection: &TemplateSelection,
    ) -> Result<Vec<Arc<dyn Template>>, TemplateError> {
        let picked: Vec<Arc<dyn Template>> = match selection {
            TemplateSelection::Generic => self
                .templates
                .iter()
                .filter(|t| !t.is_scenario())
                .cloned()
                .collect(),
            TemplateSelection::Scenario => self
                .templates
                .iter()
                .filter(|t| t.is_scenario())
                .cloned()
                .collect(),
            TemplateSelection::Any => self.templates.clone(),
            TemplateSelection::Named(name) => match self.get(name) {
                Some(t) => vec![t.clone()],
                None => {
                    return Err(TemplateError::Unknown {
                        name: name.clone(),
                        available: self.names().join(", "),
                    })
                }
            },
        };

        if picked.is_empty() {
            return Err(TemplateError::Empty {
                selection: selection.to_string(),
            });
        }
        Ok(picked)
    }

    /// Build a generator bound to `selection`.
    pub fn generator(&self, selection: &TemplateSelection) -> Result<Generator, TemplateError> {
        Ok(Generator {
            candidates: self.candidates(selection)?,
        })
    }
}

/// Draws records uniformly from a fixed candidate set.
#[derive(Clone)]
pub struct Generator {
    candidates: Vec<Arc<dyn Template>>,
}

impl Generator {
    pub fn generate(&self, rng: &mut dyn RngCore) -> IncidentRecord {
        let idx = rng.gen_range(0..self.candidates.len());
        self.candidates[idx].generate(rng)
    }

    pub fn template_names(&self) -> Vec<&'static str> {
        self.candidates.iter().map(|t| t.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use std::collections::HashSet;

    struct Heartbeat;

    impl Template for Heartbeat {
        fn name(&self) -> &'static str {
            "heartbeat"
        }
        fn description(&self) -> &'static str {
            "test-only heartbeat"
        }
        fn generate(&self, _rng: &mut dyn RngCore) -> IncidentRecord {
            IncidentRecord::from_value(json!({
                "eventType": "Heartbeat",
                "timestamp": super::super::timestamp_now(),
            }))
        }
    }

    #[test]
    fn test_builtin_has_six_templates() {
        let reg = TemplateRegistry::builtin();
        assert_eq!(reg.len(), 6);
        assert_eq!(
            reg.names(),
            vec!["generic", "cpu-spike", "crash-loop", "api-error", "db-latency", "dns-failure"]
        );
        let unique: HashSet<_> = reg.names().into_iter().collect();
        assert_eq!(unique.len(), reg.len());
    }

    #[test]
    fn test_builtin_names_cannot_be_registered_twice() {
        let mut reg = TemplateRegistry::builtin();
        assert!(matches!(
            reg.register(Arc::new(CrashLoop)),
            Err(TemplateError::Duplicate { name }) if name == "crash-loop"
        ));
        assert_eq!(reg.len(), 6);
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!("generic".parse::<TemplateSelection>().unwrap(), TemplateSelection::Generic);
        assert_eq!("Scenario".parse::<TemplateSelection>().unwrap(), TemplateSelection::Scenario);
        assert_eq!("any".parse::<TemplateSelection>().unwrap(), TemplateSelection::Any);
        assert_eq!(
            "crash-loop".parse::<TemplateSelection>().unwrap(),
            TemplateSelection::Named("crash-loop".to_string())
        );
    }

    #[test]
    fn test_scenario_selection_excludes_generic() {
        let reg = TemplateRegistry::builtin();
        let names: Vec<_> = reg
            .candidates(&TemplateSelection::Scenario)
            .unwrap()
            .iter()
            .map(|t| t.name())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(!names.contains(&"generic"));
    }

    #[test]
    fn test_unknown_template_is_rejected() {
        let reg = TemplateRegistry::builtin();
        let err = reg
            .candidates(&TemplateSelection::Named("disk-full".to_string()))
            .err()
            .unwrap();
        assert!(err.to_string().contains("disk-full"));
        assert!(err.to_string().contains("crash-loop"));
    }

    #[test]
    fn test_empty_registry_is_rejected() {
        let reg = TemplateRegistry::new();
        assert!(matches!(
            reg.candidates(&TemplateSelection::Any),
            Err(TemplateError::Empty { .. })
        ));
    }

    #[test]
    fn test_register_new_scenario() {
        let mut reg = TemplateRegistry::builtin();
        reg.register(Arc::new(Heartbeat)).unwrap();
        assert!(matches!(
            reg.register(Arc::new(Heartbeat)),
            Err(TemplateError::Duplicate { .. })
        ));

        let generator = reg.generator(&TemplateSelection::Named("heartbeat".into())).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(generator.generate(&mut rng).event_type(), Some("Heartbeat"));
        assert_eq!(reg.candidates(&TemplateSelection::Scenario).unwrap().len(), 6);
    }

    #[test]
    fn test_scenario_generator_covers_all_scenarios() {
        let reg = TemplateRegistry::builtin();
        let generator = reg.generator(&TemplateSelection::Scenario).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        let seen: HashSet<String> = (0..500)
            .filter_map(|_| generator.generate(&mut rng).event_type().map(str::to_string))
            .collect();
        let expected: HashSet<String> = [
            "ResourceExhaustion",
            "PodCrashLoop",
            "ApiError",
            "DatabaseLatency",
            "DnsFailure",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_every_template_emits_event_type_and_timestamp() {
        let reg = TemplateRegistry::builtin();
        let generator = reg.generator(&TemplateSelection::Any).unwrap();
        let mut rng = StdRng::seed_from_u64(1234);
        for _ in 0..1_000 {
            let r = generator.generate(&mut rng);
            assert!(r.event_type().is_some_and(|s| !s.is_empty()));
            assert!(r.timestamp().is_some_and(|s| !s.is_empty()));
        }
    }
}
