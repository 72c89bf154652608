use clap::{Parser, Subcommand};

use enrich_engine::config::JobConfig;
use enrich_engine::registry::FilterRegistry;

#[derive(Parser)]
#[command(name = "enrich", about = "Enrich JSON-lines records through a text analysis service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a job: read input, filter, write output.
    Run {
        /// Path to the job TOML file.
        #[arg(long, default_value = "job.toml", env = "ENRICH_CONFIG")]
        config: String,
    },
    /// Print the job's output schema as JSON without contacting the service.
    Schema {
        /// Path to the job TOML file.
        #[arg(long, default_value = "job.toml", env = "ENRICH_CONFIG")]
        config: String,
    },
}

fn registry() -> FilterRegistry {
    let mut registry = FilterRegistry::new();
    registry.register(enrich_filter_text_analytics::PLUGIN_NAME, enrich_filter_text_analytics::create);
    registry
}

fn load(path: &str) -> JobConfig {
    tracing::info!(config = %path, "loading job configuration");
    match JobConfig::load(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout may carry records.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let registry = registry();

    match cli.command {
        Command::Run { config } => {
            let job = load(&config);
            match enrich_engine::runner::run_job(&job, &registry).await {
                Ok(summary) => {
                    tracing::info!(records = summary.records, pages = summary.pages, "done");
                }
                Err(e) => {
                    tracing::error!(error = %e, "job failed");
                    std::process::exit(1);
                }
            }
        }
        Command::Schema { config } => {
            let job = load(&config);
            let schema = match enrich_engine::runner::output_schema(&job, &registry) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to resolve output schema");
                    std::process::exit(1);
                }
            };
            match serde_json::to_string_pretty(&schema) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    tracing::error!(error = %e, "failed to print schema");
                    std::process::exit(1);
                }
            }
        }
    }
}
