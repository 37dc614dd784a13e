mod actions;
mod annotate;
mod cli;
mod config;
mod engine;
mod orchestrator;
mod partition;
mod report;
mod types;
mod util;

use actions::GithubActions;
use clap::Parser;
use cli::Cli;
use engine::YamlSchemaEngine;
use orchestrator::Outcome;
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: i32 = 1;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stdout carries workflow commands, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let engine = YamlSchemaEngine::new();
    let mut sink = GithubActions::from_env();

    if let Outcome::Failed(_) = orchestrator::run(&cli.inputs(), &engine, &mut sink).await {
        std::process::exit(EXIT_FAILURE);
    }
}
