//! doi-lint CLI
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use camino::Utf8PathBuf;
use clap::Parser;
use doi_lint::{Cli, Commands, commands};
use doi_lint_core::config::{Config, ConfigLoader, ConfigSources};

mod observability;

fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();
    cli.color.apply();

    if cli.version_only {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    // Without a subcommand clap has already printed help.
    let Some(command) = cli.command.take() else {
        return Ok(());
    };

    if let Some(dir) = &cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("cannot enter {}", dir.display()))?;
    }
    let (config, sources) = load_config(cli.config.as_deref())?;

    let log_dir = config.log_dir.as_ref().map(|dir| dir.clone().into_std_path_buf());
    let _log_guard = observability::init_observability(
        &observability::ObservabilityConfig::from_env_with_overrides(log_dir),
        observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str()),
    )
    .context("failed to initialize logging")?;
    tracing::debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        json = cli.json,
        color = ?cli.color,
        "starting"
    );

    let outcome = match command {
        Commands::Check(args) => commands::check::cmd_check(args, cli.json, cli.quiet, &config),
        Commands::Info(args) => commands::info::cmd_info(args, cli.json, &config, &sources),
    };
    if let Err(err) = &outcome {
        tracing::error!(error = %err, "doi-lint failed");
    }
    outcome
}

/// Discover config from the working directory, then layer `--config` on top.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<(Config, ConfigSources)> {
    let cwd = std::env::current_dir().context("cannot read the working directory")?;
    let mut loader = ConfigLoader::new().with_project_search(utf8(cwd, "working directory")?);
    if let Some(path) = explicit {
        loader = loader.with_file(utf8(path.to_path_buf(), "config path")?);
    }
    loader.load().context("failed to load configuration")
}

fn utf8(path: PathBuf, what: &str) -> anyhow::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|path| anyhow!("{what} is not valid UTF-8: {}", path.display()))
}
