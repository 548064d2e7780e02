use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{header::ACCEPT, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GlobalConfig;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to connect to GitHub. Perhaps your internet is down, or GitHub is having an outage. ({0})")]
    FailedToConnect(#[source] reqwest::Error),
    #[error("The response to '{request}' could not be decoded: {source}")]
    Decode {
        request: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to '{request}', got a status code of: {status}")]
    BadResponse { status: StatusCode, request: String },
}

/// An access token for the GitHub API. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Returns `None` for a blank token, which is never worth sending.
    pub fn new(raw: impl Into<String>) -> Option<Token> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        Some(Token(trimmed.to_string()))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub login: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Repository {
    // "owner/name"
    pub full_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Invitation {
    pub id: u64,
    pub repository: Repository,
}

#[async_trait]
pub trait GitHub {
    async fn current_user(&self, token: &Token) -> Result<User, ApiError>;
    async fn list_invitations(&self, token: &Token) -> Result<Vec<Invitation>, ApiError>;
    async fn accept_invitation(&self, token: &Token, id: u64) -> Result<(), ApiError>;
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    host: String,
    accept: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(global_config: &GlobalConfig) -> Result<ApiClient, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gh-accept/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(global_config.request_timeout_secs()))
            .build()
            .map_err(ApiError::FailedToConnect)?;

        Ok(ApiClient {
            host: global_config.host(),
            accept: global_config.accept(),
            http,
        })
    }

    pub fn get_host(&self) -> &str {
        self.host.trim_end_matches('/')
    }
}

#[async_trait]
impl GitHub for ApiClient {
    async fn current_user(&self, token: &Token) -> Result<User, ApiError> {
        let resp = self
            .http
            .get(format!("{}/user", self.get_host()))
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(ApiError::FailedToConnect)?;

        if resp.status() != StatusCode::OK {
            return Err(ApiError::BadResponse {
                request: format!("GET {}/user", self.get_host()),
                status: resp.status(),
            });
        }

        resp.json::<User>().await.map_err(|e| ApiError::Decode {
            request: format!("GET {}/user", self.get_host()),
            source: e,
        })
    }

    async fn list_invitations(&self, token: &Token) -> Result<Vec<Invitation>, ApiError> {
        let resp = self
            .http
            .get(format!("{}/user/repository_invitations", self.get_host()))
            .bearer_auth(token.secret())
            .header(ACCEPT, &self.accept)
            .send()
            .await
            .map_err(ApiError::FailedToConnect)?;

        if !resp.status().is_success() {
            return Err(ApiError::BadResponse {
                request: format!("GET {}/user/repository_invitations", self.get_host()),
                status: resp.status(),
            });
        }

        resp.json::<Vec<Invitation>>()
            .await
            .map_err(|e| ApiError::Decode {
                request: format!("GET {}/user/repository_invitations", self.get_host()),
                source: e,
            })
    }

    async fn accept_invitation(&self, token: &Token, id: u64) -> Result<(), ApiError> {
        let resp = self
            .http
            .patch(format!(
                "{}/user/repository_invitations/{}",
                self.get_host(),
                id
            ))
            .bearer_auth(token.secret())
            .header(ACCEPT, &self.accept)
            .send()
            .await
            .map_err(ApiError::FailedToConnect)?;

        // GitHub answers an accepted invitation with an empty 204, nothing else counts
        if resp.status() != StatusCode::NO_CONTENT {
            return Err(ApiError::BadResponse {
                request: format!(
                    "PATCH {}/user/repository_invitations/{}",
                    self.get_host(),
                    id
                ),
                status: resp.status(),
            });
        }

        Ok(())
    }
}
