//! Pieces shared by the `sample` and `hydrate` binaries: the `--log-level`
//! flag, tracing setup and progress bar styling.

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing_subscriber::filter::LevelFilter;

/// Template used by every progress bar so both stages look alike.
pub const PROGRESS_TEMPLATE: &str = "Progress: |{bar:50}| {percent}% {msg}";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Install a stderr `fmt` subscriber capped at `level`.
///
/// Logs go to stderr so the operator summary on stdout stays clean.
pub fn init_tracing(level: LogLevel) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(level))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

/// Build a bar of `len` steps drawn to stderr, or a hidden one when `visible`
/// is false (tests, non-interactive runs).
pub fn progress_bar(len: u64, visible: bool) -> anyhow::Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(ProgressStyle::with_template(PROGRESS_TEMPLATE)?.progress_chars("█-"));
    Ok(pb)
}
