//! Configuration
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

const DEV_SECRET: &str = "dev-secret-change-in-production";

/// Plant-care authentication service
#[derive(Parser, Debug, Clone)]
#[command(name = "plantcare-auth")]
#[command(about = "Token issuance and key custody for the plant-care platform")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "plantcare")]
    pub mongodb_db: String,

    /// Secret protecting the stored signing key (required in production)
    #[arg(long, env = "SECRET_KEY", default_value = DEV_SECRET, hide_env_values = true)]
    pub secret_key: String,

    /// Issued token lifetime in hours
    #[arg(long, env = "TOKEN_TTL_HOURS", default_value = "24")]
    pub token_ttl_hours: i64,

    /// Create the default admin/user accounts on startup if missing
    #[arg(long, env = "SEED_DEFAULT_USERS", default_value = "true")]
    pub seed_default_users: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Whether the built-in development secret is in use.
    pub fn using_dev_secret(&self) -> bool {
        self.secret_key == DEV_SECRET
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.secret_key.is_empty() {
            return Err("SECRET_KEY must not be empty".into());
        }
        if self.token_ttl_hours <= 0 {
            return Err("TOKEN_TTL_HOURS must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_and_validate() {
        let args = Args::parse_from(["plantcare-auth"]);
        assert_eq!(args.token_ttl_hours, 24);
        assert!(args.seed_default_users);
        assert!(args.using_dev_secret());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        let args = Args::parse_from(["plantcare-auth", "--token-ttl-hours", "0"]);
        assert!(args.validate().is_err());
    }
}
