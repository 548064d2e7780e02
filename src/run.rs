use std::io::Write;

use anyhow::{anyhow, Result};
use tracing::error;

use crate::{
    api::{GitHub, Token},
    console::Console,
    credentials::{AuthHelper, CredentialResolver, TokenPrompt},
    invitations::{accept_invitations, list_invitations, validate_token, Summary},
};

pub struct RunArgs {
    /// Only list what would be accepted.
    pub dry_run: bool,
}

/// Where a run stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    NoToken,
    InvalidToken,
    ListingFailed(String),
    NoInvitations,
    DryRun(usize),
    Finished(Summary),
}

impl RunOutcome {
    /// Whether `--strict` should turn this outcome into a failing exit status.
    pub fn is_failure(&self) -> bool {
        match self {
            RunOutcome::NoToken | RunOutcome::InvalidToken | RunOutcome::ListingFailed(_) => true,
            RunOutcome::NoInvitations | RunOutcome::DryRun(_) => false,
            RunOutcome::Finished(summary) => summary.failed > 0,
        }
    }

    pub fn into_result(self, strict: bool) -> Result<()> {
        if !strict || !self.is_failure() {
            return Ok(());
        }

        match self {
            RunOutcome::Finished(summary) => Err(anyhow!(
                "{} of {} invitation(s) could not be accepted",
                summary.failed,
                summary.total
            )),
            other => Err(anyhow!("Run did not complete: {:?}", other)),
        }
    }
}

pub async fn run_accept<G, H, P, W>(
    github: &G,
    resolver: &CredentialResolver<H, P>,
    args: RunArgs,
    console: &mut Console<W>,
) -> RunOutcome
where
    G: GitHub,
    H: AuthHelper,
    P: TokenPrompt,
    W: Write,
{
    console.line("Accept GitHub invitations");
    console.line("=".repeat(40));

    let token = match Token::new(resolver.resolve(console).await) {
        Some(t) => t,
        None => {
            console.line("No token available");
            return RunOutcome::NoToken;
        }
    };

    if !validate_token(github, &token, console).await {
        return RunOutcome::InvalidToken;
    }

    let invitations = match list_invitations(github, &token, console).await {
        Ok(i) => i,
        Err(e) => {
            error!("{:?}", e);
            console.line(format!("Failed to fetch invitations: {}", e));
            return RunOutcome::ListingFailed(e.to_string());
        }
    };

    if invitations.is_empty() {
        return RunOutcome::NoInvitations;
    }

    if args.dry_run {
        console.blank();
        console.line("Dry run, nothing was accepted.");
        return RunOutcome::DryRun(invitations.len());
    }

    let summary = accept_invitations(github, &token, &invitations, console).await;

    console.blank();
    console.line("Done!");

    RunOutcome::Finished(summary)
}
