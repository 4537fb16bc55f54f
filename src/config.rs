use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;

use crate::client::{ApiClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::session::TokenStore;

/// Where the backend lives and where the session token is kept.
#[derive(Debug, Clone, Args)]
pub struct ConnectionConfig {
    /// Backend base URL
    #[arg(long, global = true, env = "ADMIN_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Request timeout in seconds
    #[arg(
        long,
        global = true,
        env = "ADMIN_API_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT.as_secs()
    )]
    pub timeout_secs: u64,

    /// File holding the bearer token between runs
    #[arg(long, global = true, env = "ADMIN_TOKEN_FILE", default_value = ".admin_token")]
    pub token_file: PathBuf,
}

impl ConnectionConfig {
    pub fn token_store(&self) -> TokenStore {
        TokenStore::new(&self.token_file)
    }

    /// Client carrying whatever token is currently stored.
    pub fn client(&self) -> anyhow::Result<ApiClient> {
        let token = self
            .token_store()
            .load()
            .with_context(|| format!("failed to read {}", self.token_file.display()))?;
        let client = ApiClient::new(&self.base_url, Duration::from_secs(self.timeout_secs))
            .context("failed to set up HTTP client")?;
        Ok(client.with_token(token))
    }
}
