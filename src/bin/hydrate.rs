use std::path::PathBuf;

use clap::Parser;
use cli_common::{LogLevel, init_tracing, progress_bar};
use skysample::{EnricherConfig, config};

#[derive(Parser, Debug)]
#[command(
    name = "hydrate",
    about = "Refresh a sampled corpus with current post data from the AppView"
)]
struct Cli {
    /// Sample document to read
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where to write the hydrated document
    #[arg(long)]
    output: Option<PathBuf>,

    /// getPosts endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Uris per request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Retries per batch after the first attempt
    #[arg(long)]
    retries: Option<u32>,

    /// TOML file with enricher settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn apply(&self, mut cfg: EnricherConfig) -> EnricherConfig {
        if let Some(input) = &self.input {
            cfg.input_path = input.clone();
        }
        if let Some(output) = &self.output {
            cfg.output_path = output.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            cfg.endpoint = endpoint.clone();
        }
        if let Some(batch_size) = self.batch_size {
            cfg.batch_size = batch_size;
        }
        if let Some(retries) = self.retries {
            cfg.retry_policy.max_retries = retries;
        }
        cfg
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level)?;
    let base = match &cli.config {
        Some(path) => config::load(path).await?,
        None => EnricherConfig::default(),
    };
    let cfg = cli.apply(base);

    let progress = progress_bar(0, !cli.quiet)?;
    let report = skysample::enrich(&cfg, &progress).await?;

    println!(
        "{} data points hydrated and written to {}",
        report.hydrated,
        cfg.output_path.display()
    );
    if report.missing() > 0 {
        println!(
            "{} URIs did not return a post and have been removed from the dataset.",
            report.missing()
        );
    }
    Ok(())
}
