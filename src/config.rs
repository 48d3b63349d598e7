//! TOML configuration and the resolved, immutable run configuration.
//!
//! A config file is optional. It is located via `--config`, then the
//! `INCIDENTSIM_CONFIG` environment variable, then compiled-in defaults.
//! Command-line flags override whatever the file says, and the merged
//! result is frozen into a [`RunConfig`] before the run starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::generate::TemplateSelection;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "INCIDENTSIM_CONFIG";

// ---------------------------------------------------------------------------
// File config
// ---------------------------------------------------------------------------

/// Root of the TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub invoke: InvokeConfig,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File this config was read from; `None` for compiled-in defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl SimConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Resolve the config file to use.
    ///
    /// A file named by `--config` or by `INCIDENTSIM_CONFIG` must load; only
    /// when neither is given are the compiled-in defaults used. Runs before
    /// logging is set up, so failures are returned rather than logged.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            return Self::load(path).with_context(|| {
                format!("{CONFIG_ENV} is set but {} could not be loaded", path.display())
            });
        }

        Ok(Self::default())
    }

    /// Merge command-line overrides and freeze the result.
    pub fn resolve(&self, overrides: RunOverrides) -> Result<RunConfig> {
        let count = overrides.count.unwrap_or(self.run.count);
        let delay_secs = overrides.delay_secs.unwrap_or(self.run.delay_secs);
        let delay = match Duration::try_from_secs_f64(delay_secs) {
            Ok(d) => d,
            Err(_) => bail!("delay must be a non-negative number of seconds, got {delay_secs}"),
        };

        let template = match overrides
            .template
            .as_deref()
            .unwrap_or(self.run.template.as_str())
            .parse::<TemplateSelection>()
        {
            Ok(t) => t,
            Err(never) => match never {},
        };

        let mode = if overrides.use_lambda {
            DeliveryMode::Invoke
        } else {
            self.run.mode
        };

        let sink = match mode {
            DeliveryMode::Http => {
                let url = overrides.api_url.unwrap_or_else(|| self.http.api_url.clone());
                if url.trim().is_empty() {
                    bail!("an endpoint URL is required for HTTP delivery (use --api-url)");
                }
                SinkConfig::Http {
                    url,
                    timeout: Duration::from_secs(self.http.timeout_secs),
                }
            }
            DeliveryMode::Invoke => SinkConfig::Invoke {
                function_name: overrides
                    .function_name
                    .unwrap_or_else(|| self.invoke.function_name.clone()),
                endpoint: overrides.invoke_endpoint.or_else(|| self.invoke.endpoint.clone()),
                timeout: Duration::from_secs(self.invoke.timeout_secs),
            },
        };

        Ok(RunConfig {
            count,
            delay,
            template,
            sink,
            on_unavailable: overrides.on_unavailable.unwrap_or(self.run.on_unavailable),
            seed: overrides.seed,
        })
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// HTTP sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Ingestion endpoint that receives `POST`ed records.
    pub api_url: String,
    /// Per-request timeout (seconds).
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:3000/prod/alerts".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Direct function invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokeConfig {
    /// Name of the function to invoke.
    pub function_name: String,
    /// Base URL of the invoke API. Without it no invocation client is built.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for InvokeConfig {
    fn default() -> Self {
        Self {
            function_name: "alert-normalizer".to_string(),
            endpoint: None,
            timeout_secs: 10,
        }
    }
}

/// Driver loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub count: u32,
    pub delay_secs: f64,
    /// `generic`, `scenario`, `any`, or a template name.
    pub template: String,
    pub mode: DeliveryMode,
    pub on_unavailable: UnavailablePolicy,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            count: 5,
            delay_secs: 1.0,
            template: "generic".to_string(),
            mode: DeliveryMode::Http,
            on_unavailable: UnavailablePolicy::Abort,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Http,
    Invoke,
}

/// What the driver does when the invocation client could not be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UnavailablePolicy {
    /// Stop the run at the first unavailable delivery.
    Abort,
    /// Count the iteration as skipped and keep going.
    Skip,
}

// ---------------------------------------------------------------------------
// Resolved config
// ---------------------------------------------------------------------------

/// Values supplied on the command line. `None` means "use the file/default".
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub count: Option<u32>,
    pub delay_secs: Option<f64>,
    pub use_lambda: bool,
    pub api_url: Option<String>,
    pub template: Option<String>,
    pub function_name: Option<String>,
    pub invoke_endpoint: Option<String>,
    pub on_unavailable: Option<UnavailablePolicy>,
    pub seed: Option<u64>,
}

/// Where records go, with the parameters each sink needs.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkConfig {
    Http {
        url: String,
        timeout: Duration,
    },
    Invoke {
        function_name: String,
        endpoint: Option<String>,
        timeout: Duration,
    },
}

/// Immutable configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub count: u32,
    pub delay: Duration,
    pub template: TemplateSelection,
    pub sink: SinkConfig,
    pub on_unavailable: UnavailablePolicy,
    /// Fixed rng seed for reproducible runs.
    pub seed: Option<u64>,
}

impl RunConfig {
    /// HTTP run against `url` with default pacing.
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            count: 5,
            delay: Duration::from_secs(1),
            template: TemplateSelection::Generic,
            sink: SinkConfig::Http {
                url: url.into(),
                timeout: Duration::from_secs(10),
            },
            on_unavailable: UnavailablePolicy::Abort,
            seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
