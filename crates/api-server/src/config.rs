//! Server configuration
//!
//! Read from `TF_*` environment variables, with an optional `.env` file
//! loaded first for local development.
//!
//! - `TF_DATA_DIR`: data directory (default `.taskflow-data`)
//! - `TF_HOST` / `TF_PORT`: bind address (default `0.0.0.0:5000`)
//! - `TF_JWT_SECRET`: HS256 signing secret
//! - `TF_TOKEN_TTL_SECONDS`: bearer token lifetime (default 7 days)
//! - `TF_ENV`: `production` hides internal error details
//! - `TF_CLIENT_URL`: allowed CORS origin (any origin when unset)

use std::path::PathBuf;

use anyhow::Context;

const DEFAULT_DATA_DIR: &str = ".taskflow-data";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_JWT_SECRET: &str = "dev-jwt-secret-change-me";
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
    pub environment: Environment,
    pub client_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match var("TF_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("TF_PORT must be a port number, got '{}'", raw))?,
            None => DEFAULT_PORT,
        };
        let token_ttl_seconds = match var("TF_TOKEN_TTL_SECONDS") {
            Some(raw) => {
                let ttl = raw.parse::<i64>().with_context(|| {
                    format!("TF_TOKEN_TTL_SECONDS must be an integer, got '{}'", raw)
                })?;
                if ttl <= 0 {
                    anyhow::bail!("TF_TOKEN_TTL_SECONDS must be positive");
                }
                ttl
            }
            None => DEFAULT_TOKEN_TTL_SECONDS,
        };
        let environment = var("TF_ENV")
            .map(|raw| Environment::parse(&raw))
            .unwrap_or(Environment::Development);

        let jwt_secret = match var("TF_JWT_SECRET") {
            Some(secret) => secret,
            None if environment == Environment::Production => {
                anyhow::bail!("TF_JWT_SECRET is required in production")
            }
            None => {
                tracing::warn!("TF_JWT_SECRET not set, using the development secret");
                DEFAULT_JWT_SECRET.to_string()
            }
        };

        Ok(Self {
            host: var("TF_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: var("TF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            jwt_secret,
            token_ttl_seconds,
            environment,
            client_url: var("TF_CLIENT_URL"),
        })
    }

    /// Development defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: data_dir.into(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            environment: Environment::Development,
            client_url: None,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
