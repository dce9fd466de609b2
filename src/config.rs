//! Server configuration, from command-line flags or the environment

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;

use crate::directory::{EmployeeDirectory, HttpDirectory, StaticDirectory};
use crate::handover::ReceiverMatch;
use crate::identity::Authenticator;

#[derive(Parser, Debug, Clone)]
#[command(name = "charge-handover")]
#[command(about = "Charge handover approval service")]
#[command(version)]
pub struct Config {
    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:handover.db?mode=rwc")]
    pub database_url: String,

    /// Maximum pooled database connections
    #[arg(long, env = "HANDOVER_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Address to listen on
    #[arg(long, env = "HANDOVER_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Shared secret for session tokens
    #[arg(long, env = "HANDOVER_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Lifetime of tokens minted by this service, in hours
    #[arg(long, env = "HANDOVER_TOKEN_TTL_HOURS", default_value_t = 12)]
    pub token_ttl_hours: i64,

    /// Base URL of the employee directory service
    #[arg(long, env = "DIRECTORY_URL", conflicts_with = "directory_file")]
    pub directory_url: Option<String>,

    /// JSON file of employees, used instead of a directory service
    #[arg(long, env = "DIRECTORY_FILE")]
    pub directory_file: Option<PathBuf>,

    /// Also match receivers by employee id and name (for migrated records)
    #[arg(long, env = "HANDOVER_LEGACY_RECEIVER_MATCH")]
    pub legacy_receiver_match: bool,
}

impl Config {
    pub fn receiver_match(&self) -> ReceiverMatch {
        if self.legacy_receiver_match {
            ReceiverMatch::Legacy
        } else {
            ReceiverMatch::Strict
        }
    }

    pub fn authenticator(&self) -> anyhow::Result<Authenticator> {
        if self.jwt_secret.trim().is_empty() {
            bail!("HANDOVER_JWT_SECRET must not be empty");
        }
        Ok(Authenticator::new(
            &self.jwt_secret,
            chrono::Duration::hours(self.token_ttl_hours),
        ))
    }

    pub fn directory(&self) -> anyhow::Result<Arc<dyn EmployeeDirectory>> {
        match (&self.directory_url, &self.directory_file) {
            (Some(url), _) => Ok(Arc::new(HttpDirectory::new(url.clone()))),
            (None, Some(path)) => {
                let directory = StaticDirectory::from_file(path)?;
                tracing::info!("Loaded {} employees from {}", directory.len(), path.display());
                Ok(Arc::new(directory))
            }
            (None, None) => bail!("either --directory-url or --directory-file is required"),
        }
    }
}
