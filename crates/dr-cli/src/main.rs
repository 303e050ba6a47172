use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dr_cli::commands::{doctor, generate, projects, repo, stats};
use dr_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so report text on stdout stays clean.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Projects { json } => projects::run(&mut out, &config, *json)?,
        Commands::Stats { selection, json } => stats::run(&mut out, &config, selection, *json)?,
        Commands::Generate {
            selection,
            words,
            prompt_only,
        } => generate::run(&mut out, &config, selection, *words, *prompt_only)?,
        Commands::Repo { action } => repo::run(&mut out, action)?,
        Commands::Doctor => doctor::run(&mut out, &config, cli.config.as_deref())?,
    }

    out.flush()?;
    Ok(())
}
