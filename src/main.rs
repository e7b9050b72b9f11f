//! flowrun CLI binary entry point.

use clap::Parser;
use flowrun::cli::{Cli, Commands};
use flowrun::config::FlowConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match FlowConfig::load(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Run(args) => flowrun::cli::run::handle_run(config, args).await,
            Commands::Config => {
                println!("{config:#?}");
                Ok(())
            }
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
