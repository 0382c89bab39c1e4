use crate::session::SessionConfig;
use clap::Parser;
use std::path::PathBuf;

/// Follow an agent's stream-json output as a live terminal view.
///
/// Reads newline-delimited JSON events on stdin and renders tool calls
/// and assistant text as they arrive. Press `v` during streaming to
/// toggle raw text visibility; tool calls are always shown.
#[derive(Parser, Debug)]
#[command(name = "loopwatch", version, about)]
pub struct Cli {
    /// Iteration number shown in the banner
    #[arg(short, long, default_value_t = 1)]
    pub iteration: u32,

    /// Run mode label (plan/build)
    #[arg(short, long, default_value = "build")]
    pub mode: String,

    /// Model name shown in the banner
    #[arg(long, default_value = "opus 4.5")]
    pub model: String,

    /// Append every raw input line to FILE for debugging
    #[arg(long, value_name = "FILE")]
    pub dump: Option<PathBuf>,
}

impl Cli {
    pub fn into_config(self) -> SessionConfig {
        SessionConfig {
            iteration: self.iteration,
            mode: self.mode,
            model: self.model,
            dump: self.dump,
        }
    }
}
