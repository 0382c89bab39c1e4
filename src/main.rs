use anyhow::Result;
use clap::Parser;
use loopwatch::cli::Cli;
use loopwatch::render::{Display, SharedDisplay, TermCaps};
use loopwatch::session::Session;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the rendered view; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Cli::parse().into_config();
    let caps = TermCaps::detect();
    let display = SharedDisplay::new(Display::new(
        Box::new(std::io::stdout()),
        caps,
        config.iteration,
        config.mode.clone(),
        config.model.clone(),
    ));

    let session = Session::new(config, display);
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    session.run(input).await
}
