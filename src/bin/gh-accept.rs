use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use gh_accept::{
    api::ApiClient,
    config::GlobalConfig,
    console::Console,
    credentials::{CommandHelper, CredentialResolver, TerminalPrompt},
    run::{run_accept, RunArgs},
    *,
};

/// Accepts every pending repository invitation on your GitHub account.
///
/// The token is read from $GITHUB_TOKEN, then from the GitHub CLI
/// (`gh auth token`), and otherwise asked for.
#[derive(Parser, Debug)]
#[command(version, author = "gh-accept")]
struct Opts {
    /// Directory holding the `config` file. Defaults to ~/.gh-accept
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Root of the GitHub API, for GitHub Enterprise servers
    #[arg(long)]
    api_url: Option<String>,

    /// List pending invitations without accepting them
    #[arg(long)]
    dry_run: bool,

    /// Exit with an error when any invitation could not be accepted
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts: Opts = Opts::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut global_config = match opts.config_dir.or_else(get_global_config_dir) {
        Some(dir) => read_global_config(dir.clone()).context(format!(
            "Failed to read the global config file: {:?}",
            dir
        ))?,
        None => {
            warn!("Can't find $HOME, using the default configuration");
            GlobalConfig::default()
        }
    };
    if let Some(host) = opts.api_url {
        global_config = global_config.with_host(host)?;
    }

    let env_var = global_config.token_env_var();
    let resolver = CredentialResolver::new(
        env_var.clone(),
        env::var(&env_var).ok(),
        CommandHelper::from_config(&global_config),
        TerminalPrompt,
    );
    let client = ApiClient::new(&global_config).context("Failed to set up the HTTP client")?;

    let outcome = run_accept(
        &client,
        &resolver,
        RunArgs {
            dry_run: opts.dry_run,
        },
        &mut Console::stdout(),
    )
    .await;

    outcome.into_result(opts.strict)
}
