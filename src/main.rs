use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use incidentsim::config::{RunOverrides, SimConfig, UnavailablePolicy};
use incidentsim::generate::{Template, TemplateRegistry, TemplateSelection};

#[derive(Parser)]
#[command(
    name = "incidentsim",
    about = "Synthetic incident generator for exercising alert ingestion pipelines",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (falls back to $INCIDENTSIM_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate incidents and send them to the configured sink
    Run {
        /// Number of incidents to send
        #[arg(long)]
        count: Option<u32>,

        /// Delay between sends (seconds)
        #[arg(long)]
        delay: Option<f64>,

        /// Invoke the normalizer function directly instead of POSTing to the API
        #[arg(long)]
        use_lambda: bool,

        /// Override the ingestion endpoint URL
        #[arg(long)]
        api_url: Option<String>,

        /// Template selection: generic, scenario, any, or a template name
        #[arg(long)]
        template: Option<String>,

        /// Function to invoke in --use-lambda mode
        #[arg(long)]
        function_name: Option<String>,

        /// Base URL of the function invoke API
        #[arg(long, env = "INCIDENTSIM_INVOKE_ENDPOINT")]
        invoke_endpoint: Option<String>,

        /// What to do when the invocation client is unavailable
        #[arg(long, value_enum)]
        on_unavailable: Option<UnavailablePolicy>,

        /// Seed the generator for a reproducible sequence
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print generated incidents as JSON lines without sending them
    Generate {
        /// Number of incidents to print
        #[arg(long, default_value = "1")]
        count: usize,

        /// Template selection: generic, scenario, any, or a template name
        #[arg(long, default_value = "any")]
        template: String,

        /// Seed the generator for a reproducible sequence
        #[arg(long)]
        seed: Option<u64>,

        /// Pretty-print each record
        #[arg(long)]
        pretty: bool,
    },

    /// List the registered incident templates
    Templates,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let file_config = SimConfig::locate(cli.config.as_deref())?;

    // Initialize tracing (stderr, so `generate` output stays clean JSON)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&file_config.logging.level));
    if cli.log_json || file_config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match &file_config.source {
        Some(path) => tracing::info!(path = %path.display(), "loaded configuration"),
        None => tracing::debug!("no config file, using compiled-in defaults"),
    }

    match cli.command {
        Commands::Run {
            count,
            delay,
            use_lambda,
            api_url,
            template,
            function_name,
            invoke_endpoint,
            on_unavailable,
            seed,
        } => {
            let config = file_config.resolve(RunOverrides {
                count,
                delay_secs: delay,
                use_lambda,
                api_url,
                template,
                function_name,
                invoke_endpoint,
                on_unavailable,
                seed,
            })?;
            let summary = incidentsim::run(&config).await?;

            println!("\n=== Incident Simulation Summary ===");
            println!("Generated:  {}", summary.generated);
            println!("Delivered:  {}", summary.delivered);
            println!("Failed:     {}", summary.failed);
            if summary.skipped > 0 {
                println!("Skipped:    {}", summary.skipped);
            }
            if summary.aborted {
                println!("Run aborted: delivery client unavailable");
            }
            println!("===================================\n");
        }
        Commands::Generate {
            count,
            template,
            seed,
            pretty,
        } => {
            let selection: TemplateSelection = template.parse()?;
            for record in incidentsim::generate_records(&selection, count, seed)? {
                let line = if pretty {
                    serde_json::to_string_pretty(&record)?
                } else {
                    serde_json::to_string(&record)?
                };
                println!("{}", line);
            }
        }
        Commands::Templates => {
            let registry = TemplateRegistry::builtin();
            println!("{:<12} | {:<8} | Description", "Template", "Kind");
            println!("{:-<12}-|-{:-<8}-|-{:-<50}", "", "", "");
            for t in registry.iter() {
                let kind = if t.is_scenario() { "scenario" } else { "metric" };
                println!("{:<12} | {:<8} | {}", t.name(), kind, t.description());
            }
        }
    }

    Ok(())
}
