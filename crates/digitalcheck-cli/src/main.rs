//! `digitalcheck`: check a legal text against the digital-readiness principles.
//!
//! **Usage:**
//! ```text
//! digitalcheck analyze [--file PATH | --sample] --model ID [--config PATH] [--no-amend] [--json]
//! digitalcheck prompt [--file PATH | --sample] [--config PATH]
//! digitalcheck catalog [--config PATH] [--yaml]
//! digitalcheck models [--config PATH]
//! ```
//!
//! Without `--file` or `--sample` the law text is read from stdin.
//! Exits non-zero on failure; the message names the failed stage.

mod display;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use digitalcheck_core::{AnalysisRequest, PromptBuilder, SAMPLE_LAW_TEXT};
use digitalcheck_runtime::{Pipeline, PipelineOptions, ProviderRegistry, RuntimeConfig};

#[derive(Parser)]
#[command(
    name = "digitalcheck",
    version,
    about = "Check legal texts against the digital-readiness principles"
)]
struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a law text and, if needed, propose an amended version
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Model identifier, e.g. "gpt-4o"
        #[arg(long, short)]
        model: String,

        /// Runtime configuration (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after the analysis
        #[arg(long)]
        no_amend: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the analysis prompt without sending it
    Prompt {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the principle catalog
    Catalog {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the catalog in its YAML file format
        #[arg(long)]
        yaml: bool,
    },

    /// List configured models and whether their credentials are present
    Models {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Read the law text from a file
    #[arg(long, short, conflicts_with = "sample")]
    file: Option<PathBuf>,

    /// Use the built-in §30 ErbStG sample text
    #[arg(long)]
    sample: bool,
}

impl InputArgs {
    fn read(&self) -> Result<String> {
        if self.sample {
            return Ok(SAMPLE_LAW_TEXT.to_string());
        }
        match &self.file {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read law text from {}", path.display())),
            None => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("Failed to read law text from stdin")?;
                Ok(text)
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "digitalcheck=debug"
    } else {
        "digitalcheck=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Analyze {
            input,
            model,
            config,
            no_amend,
            json,
        } => analyze(&input, &model, config.as_deref(), no_amend, json).await,
        Command::Prompt { input, config } => {
            let config = load_config(config.as_deref())?;
            let catalog = config.load_catalog()?;
            let text = input.read()?;
            println!("{}", PromptBuilder::new(&catalog).analysis_prompt(&text));
            Ok(())
        }
        Command::Catalog { config, yaml } => {
            let catalog = load_config(config.as_deref())?.load_catalog()?;
            if yaml {
                print!("{}", serde_yaml::to_string(&catalog)?);
            } else {
                print!("{}", display::render_catalog(&catalog));
            }
            Ok(())
        }
        Command::Models { config } => {
            let config = load_config(config.as_deref())?;
            print!(
                "{}",
                display::render_models(&config, &ProviderRegistry::with_defaults())
            );
            Ok(())
        }
    }
}

async fn analyze(
    input: &InputArgs,
    model: &str,
    config_path: Option<&Path>,
    no_amend: bool,
    json: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;

    // Only the selected model needs credentials
    if config.model(model).is_none() {
        let available: Vec<&str> = config.models.iter().map(|m| m.id.as_str()).collect();
        bail!(
            "Pipeline failed at stage 'idle': unknown model '{}'. Available: {:?}",
            model,
            available
        );
    }
    config.models.retain(|m| m.id == model);

    let text = input.read()?;
    tracing::debug!(model = %model, chars = text.len(), "Read law text");
    let pipeline = Pipeline::from_config(&config, &ProviderRegistry::with_defaults())
        .map_err(|e| anyhow::anyhow!("Pipeline failed at stage '{}': {}", e.stage(), e))?;
    let options = PipelineOptions {
        amend: !no_amend,
        ..pipeline.options()
    };
    let pipeline = pipeline.with_options(options);

    let report = pipeline
        .run(&AnalysisRequest::new(text, model))
        .await
        .map_err(|e| anyhow::anyhow!("Pipeline failed at stage '{}': {}", e.stage(), e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", display::render_report(&report));
    }
    Ok(())
}
