use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const DEFAULT_HOST: &str = "https://api.github.com";
pub const DEFAULT_ACCEPT: &str = "application/vnd.github.v3+json";
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct ApiConfig {
    pub host: Option<String>,
    // Media type sent on the invitation endpoints
    pub accept: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct CredentialsConfig {
    pub env_var: Option<String>,
    // Program followed by its arguments, e.g. ["gh", "auth", "token"]
    pub helper: Option<Vec<String>>,
    pub helper_timeout_secs: Option<u64>,
}

// What's stored in their home directory
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct GlobalConfig {
    pub api: Option<ApiConfig>,
    pub credentials: Option<CredentialsConfig>,
}

impl GlobalConfig {
    pub fn host(&self) -> String {
        self.api
            .as_ref()
            .and_then(|a| a.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    pub fn accept(&self) -> String {
        self.api
            .as_ref()
            .and_then(|a| a.accept.clone())
            .unwrap_or_else(|| DEFAULT_ACCEPT.to_string())
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.api
            .as_ref()
            .and_then(|a| a.request_timeout_secs)
            .unwrap_or(30)
    }

    pub fn token_env_var(&self) -> String {
        self.credentials
            .as_ref()
            .and_then(|c| c.env_var.clone())
            .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string())
    }

    pub fn helper(&self) -> Vec<String> {
        self.credentials
            .as_ref()
            .and_then(|c| c.helper.clone())
            .unwrap_or_else(|| vec!["gh".into(), "auth".into(), "token".into()])
    }

    pub fn helper_timeout_secs(&self) -> u64 {
        self.credentials
            .as_ref()
            .and_then(|c| c.helper_timeout_secs)
            .unwrap_or(5)
    }

    /// Points the client at another API root, e.g. a GitHub Enterprise server.
    pub fn with_host(mut self, host: String) -> Result<GlobalConfig> {
        url::Url::parse(&host).context(format!("'{}' is not a valid API url", host))?;

        let mut api = self.api.unwrap_or_default();
        api.host = Some(host);
        self.api = Some(api);

        Ok(self)
    }
}

/// `None` when there's no $HOME to look in.
pub fn get_global_config_dir() -> Option<PathBuf> {
    let home = dirs::home_dir()?;

    Some(Path::new(&home).join(".gh-accept"))
}

/// Reads `<dir>/config`. A missing file is not an error, nothing is created.
pub fn read_global_config(dir: PathBuf) -> Result<GlobalConfig> {
    let filepath = dir.join("config");
    if !filepath.is_file() {
        debug!("no config file at {:?}, using defaults", filepath);
        return Ok(GlobalConfig::default());
    }

    let f = fs::read_to_string(filepath.clone())
        .context(format!("Can't read path {:?}", filepath))?;
    let config: GlobalConfig = toml::from_str(f.as_str())
        .context(format!("Failed to parse config file {:?}", filepath))?;

    if let Some(host) = config.api.as_ref().and_then(|a| a.host.as_ref()) {
        url::Url::parse(host).context(format!(
            "'api.host' in {:?} is not a valid url: '{}'",
            filepath, host
        ))?;
    }

    Ok(config)
}
