use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::proxy::RouteSet;

pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.maxstudio.ai";
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";
pub const DEFAULT_BUCKET: &str = "modelcrew";
pub const DEFAULT_REGION: &str = "us-east-2";
pub const DEFAULT_MODELS_ROOT: &str = "/workspaces/models";
pub const DEFAULT_DATASET_ROOT: &str = "/workspaces/models/dataset";

/// Errors raised while assembling configuration, always before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("AWS credentials not found: set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY")]
    MissingCredentials,

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("key prefix must not be empty")]
    EmptyPrefix,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub storage: StorageConfig,
    pub sources: SourceRoots,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub routes: RouteSet,
    /// Path every relay route is mounted below, empty for the root.
    pub base_path: String,
}

#[derive(Clone, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_header: String,
}

// The API key never goes to the log.
impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_header", &self.api_key_header)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct StorageConfig {
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_prefix: Option<String>,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_region", &self.s3_region)
            .field("s3_access_key_id", &self.s3_access_key_id.as_ref().map(|_| "<set>"))
            .field("s3_secret_access_key", &self.s3_secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_prefix", &self.s3_prefix)
            .finish()
    }
}

/// Local roots the sync command derives its source paths from.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRoots {
    pub models_root: PathBuf,
    pub dataset_root: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    var: "PORT",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => 3000,
        };

        let routes: RouteSet = match var("PROXY_ROUTES") {
            Some(raw) => raw.parse().map_err(|reason: String| ConfigError::Invalid {
                var: "PROXY_ROUTES",
                value: raw.clone(),
                reason,
            })?,
            None => RouteSet::Full,
        };

        Ok(Self {
            server: ServerConfig {
                port,
                host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                routes,
                base_path: var("PROXY_BASE_PATH").unwrap_or_default(),
            },
            upstream: UpstreamConfig {
                base_url: var("MAXSTUDIO_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                api_key: var("MAXSTUDIO_API_KEY"),
                api_key_header: var("MAXSTUDIO_API_KEY_HEADER")
                    .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
            },
            storage: StorageConfig {
                s3_bucket: var("AWS_S3_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
                s3_region: var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
                s3_access_key_id: var("AWS_ACCESS_KEY_ID"),
                s3_secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
                s3_endpoint: var("S3_ENDPOINT"),
                s3_prefix: var("S3_PREFIX"),
            },
            sources: SourceRoots {
                models_root: var("MODELS_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_ROOT)),
                dataset_root: var("DATASET_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_ROOT)),
            },
        })
    }
}
