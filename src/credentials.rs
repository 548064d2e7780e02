use std::{io, process::ExitStatus, time::Duration};

use async_trait::async_trait;
use dialoguer::Password;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{config::GlobalConfig, console::Console};

#[derive(Error, Debug)]
pub enum HelperError {
    #[error("no authentication helper is configured")]
    NotConfigured,
    #[error("could not start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("'{program}' did not answer within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("'{program}' exited with {status}")]
    Failed { program: String, status: ExitStatus },
    #[error("'{program}' printed no token")]
    Empty { program: String },
}

/// Something that already holds a token for this machine, like the GitHub CLI.
#[async_trait]
pub trait AuthHelper {
    async fn token(&self) -> Result<String, HelperError>;
}

/// Asks the person at the terminal. May return an empty string.
pub trait TokenPrompt {
    fn ask(&self) -> io::Result<String>;
}

pub struct CommandHelper {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandHelper {
    pub fn new(argv: Vec<String>, timeout: Duration) -> CommandHelper {
        CommandHelper { argv, timeout }
    }

    pub fn from_config(global_config: &GlobalConfig) -> CommandHelper {
        CommandHelper::new(
            global_config.helper(),
            Duration::from_secs(global_config.helper_timeout_secs()),
        )
    }
}

#[async_trait]
impl AuthHelper for CommandHelper {
    async fn token(&self) -> Result<String, HelperError> {
        let (program, args) = self.argv.split_first().ok_or(HelperError::NotConfigured)?;

        let child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| HelperError::TimedOut {
                program: program.clone(),
                timeout: self.timeout,
            })?
            .map_err(|e| HelperError::Spawn {
                program: program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            debug!(
                "{} stderr: {}",
                program,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(HelperError::Failed {
                program: program.clone(),
                status: output.status,
            });
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(HelperError::Empty {
                program: program.clone(),
            });
        }

        Ok(token)
    }
}

pub struct TerminalPrompt;

impl TokenPrompt for TerminalPrompt {
    fn ask(&self) -> io::Result<String> {
        Password::new()
            .with_prompt("Enter your GitHub token")
            .allow_empty_password(true)
            .interact()
    }
}

/// Finds a token: the environment first, then the helper, then the prompt.
pub struct CredentialResolver<H: AuthHelper, P: TokenPrompt> {
    env_var: String,
    env_value: Option<String>,
    helper: H,
    prompt: P,
}

impl<H: AuthHelper, P: TokenPrompt> CredentialResolver<H, P> {
    /// `env_value` is the variable's value as read once at startup.
    pub fn new(
        env_var: String,
        env_value: Option<String>,
        helper: H,
        prompt: P,
    ) -> CredentialResolver<H, P> {
        CredentialResolver {
            env_var,
            env_value,
            helper,
            prompt,
        }
    }

    /// Never fails. An empty string means no token could be found.
    pub async fn resolve<W: io::Write>(&self, console: &mut Console<W>) -> String {
        if let Some(value) = self.env_value.as_deref().map(str::trim) {
            if !value.is_empty() {
                console.line(format!("Token read from ${}", self.env_var));
                return value.to_string();
            }
        }

        match self.helper.token().await {
            Ok(token) => {
                console.line("Token read from the GitHub CLI");
                return token;
            }
            Err(e) => {
                debug!("authentication helper unavailable: {}", e);
                console.line(format!("GitHub CLI not found or not configured ({})", e));
            }
        }

        match self.prompt.ask() {
            Ok(input) => input.trim().to_string(),
            Err(e) => {
                warn!("Failed to read a token from the terminal: {}", e);
                String::new()
            }
        }
    }
}
