mod cli;
mod commands;
mod mcp;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, GlobalArgs};
use mintset::Config;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries MCP frames and command output; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mintset=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = configure(cli.global);

    match cli.command {
        Commands::Build {
            records,
            output,
            no_solutions,
        } => {
            commands::build::run(config.suppress_solutions(no_solutions), &records, &output)
                .await?;
        }
        Commands::Generate {
            bank,
            n,
            year,
            paper,
            topic,
            seed,
            history,
            output,
            no_solutions,
        } => {
            let options = commands::generate::GenerateOptions {
                count: n,
                filters: mintset::selection::Filters { year, paper, topic },
                seed,
                history,
            };
            let config = config.suppress_solutions(no_solutions);
            commands::generate::run(config, &bank, &output, &options).await?;
        }
        Commands::Pages { spec } => {
            commands::pages::run(&spec);
        }
        Commands::Check {
            records,
            no_solutions,
        } => {
            commands::check::run(config.suppress_solutions(no_solutions), &records).await?;
        }
        Commands::Cache => {
            commands::cache::run(&config);
        }
        Commands::Mcp => {
            mcp::run_server(config).await?;
        }
    }

    Ok(())
}

fn configure(global: GlobalArgs) -> Config {
    let mut config = Config::from_env();
    if let Some(root) = global.document_root {
        config.document_root = root;
    }
    if let Some(dir) = global.cache_dir {
        config.cache_dir = dir;
    }
    if let Some(secs) = global.timeout_secs {
        config.fetch_timeout = Duration::from_secs(secs);
    }
    if let Some(policy) = global.empty_pages {
        config.empty_pages = policy;
    }
    config
}
