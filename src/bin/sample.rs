use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use cli_common::{LogLevel, init_tracing, progress_bar};
use skysample::{SamplerConfig, Termination, config};

#[derive(Parser, Debug)]
#[command(
    name = "sample",
    about = "Reservoir-sample posts from Bluesky's Jetstream into a corpus file"
)]
struct Cli {
    /// Duration in seconds to sample for
    duration_s: u64,

    /// Target number of posts to collect
    sample_size: usize,

    /// Jetstream subscribe URL
    #[arg(long)]
    source: Option<String>,

    /// Language code posts must declare
    #[arg(long)]
    lang: Option<String>,

    /// Where to write the sample document
    #[arg(long)]
    output: Option<PathBuf>,

    /// Seed for reproducible sampling
    #[arg(long)]
    seed: Option<u64>,

    /// TOML file with sampler settings
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
    fn apply(&self, mut cfg: SamplerConfig) -> SamplerConfig {
        cfg.duration = Duration::from_secs(self.duration_s);
        cfg.capacity = self.sample_size;
        if let Some(source) = &self.source {
            cfg.source_uri = source.clone();
        }
        if let Some(lang) = &self.lang {
            cfg.language_filter = lang.clone();
        }
        if let Some(output) = &self.output {
            cfg.output_path = output.clone();
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
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
        None => SamplerConfig::default(),
    };
    let cfg = cli.apply(base);

    let progress = progress_bar(cfg.duration.as_secs(), !cli.quiet)?;
    let run = skysample::sample(&cfg, &progress).await?;

    println!(
        "Collected {} posts from {} total seen.",
        run.document.data.len(),
        run.seen
    );
    run.document.save(&cfg.output_path).await?;
    println!("Data written to {}", cfg.output_path.display());

    if let Termination::Failed(e) = run.termination {
        anyhow::bail!("stream failed after {:.1}s: {e}", run.elapsed.as_secs_f64());
    }
    Ok(())
}
