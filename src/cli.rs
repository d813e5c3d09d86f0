//! Command line surface: `serve` runs the relay, `sync` mirrors a dataset.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{info, warn};

use studio_bridge::config::{Config, ConfigError};
use studio_bridge::proxy::{AppState, RouteSet};
use studio_bridge::storage::{MemoryStore, ObjectStore, S3Store};
use studio_bridge::sync::{self, SourceSet, SyncTarget};

#[derive(Debug, Parser)]
#[command(name = "studio-bridge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the CORS relay in front of the MaxStudio API
    Serve(ServeArgs),
    /// Replace everything under a bucket prefix with the local dataset
    Sync(SyncArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Route table to expose (overrides PROXY_ROUTES)
    #[arg(long, value_enum)]
    pub routes: Option<RouteSet>,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Model name; selects source folders and uses `<model>/` as the prefix
    pub model: Option<String>,

    /// Key prefix (overrides the model name and S3_PREFIX)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Bucket (overrides AWS_S3_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    #[arg(long)]
    pub images_dir: Option<PathBuf>,

    #[arg(long)]
    pub captions_dir: Option<PathBuf>,

    #[arg(long)]
    pub meta_file: Option<PathBuf>,

    /// Run against an empty in-memory bucket instead of S3
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    /// Prefix precedence: `--prefix`, then the model name, then `S3_PREFIX`.
    pub fn key_prefix(&self, config: &Config) -> Result<String, ConfigError> {
        self.prefix
            .clone()
            .or_else(|| self.model.as_ref().map(|model| format!("{}/", model)))
            .or_else(|| config.storage.s3_prefix.clone())
            .ok_or(ConfigError::Missing("S3_PREFIX"))
    }

    pub fn sources(&self, config: &Config) -> SourceSet {
        let mut sources = match &self.model {
            Some(model) => SourceSet::for_model(&config.sources.models_root, model),
            None => SourceSet::for_dataset(&config.sources.dataset_root),
        };
        if let Some(dir) = &self.images_dir {
            sources.images_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.captions_dir {
            sources.captions_dir = Some(dir.clone());
        }
        if let Some(file) = &self.meta_file {
            sources.meta_file = Some(file.clone());
        }
        sources
    }
}

pub async fn run_serve(mut config: Config, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(routes) = args.routes {
        config.server.routes = routes;
    }
    info!("Configuration loaded: {:?}", config.server);

    let state = AppState::from_config(&config).context("invalid relay configuration")?;
    info!(upstream = %state.upstream.base_url(), "Relay upstream configured");
    let app = studio_bridge::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid listen address")?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

pub async fn run_sync(config: Config, args: SyncArgs) -> anyhow::Result<()> {
    let prefix = args.key_prefix(&config)?;
    let target = SyncTarget::from_storage_config(&config.storage, args.bucket.clone(), &prefix)?;
    let sources = args.sources(&config);
    info!(sources = ?sources, "Resolved sync sources");

    let store: Box<dyn ObjectStore> = if args.dry_run {
        warn!("Dry run: nothing is deleted or uploaded in S3");
        Box::new(MemoryStore::new(target.bucket.clone()))
    } else {
        Box::new(S3Store::connect(&target)?)
    };

    let report = sync::sync(store.as_ref(), &target, &sources)
        .await
        .context("sync failed")?;

    println!("{}", report.summary(&target));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
    }

    fn sync_args(argv: &[&str]) -> SyncArgs {
        let cli = Cli::try_parse_from(argv.iter().copied()).unwrap();
        match cli.command {
            Command::Sync(args) => args,
            Command::Serve(_) => panic!("expected sync"),
        }
    }

    #[test]
    fn test_model_selects_prefix_and_sources() {
        let config = config(&[("MODELS_ROOT", "/m")]);
        let args = sync_args(&["studio-bridge", "sync", "blondie"]);

        assert_eq!(args.key_prefix(&config).unwrap(), "blondie/");
        let sources = args.sources(&config);
        assert_eq!(
            sources.images_dir,
            Some(PathBuf::from("/m/blondie/outputs/faceswapped"))
        );
    }

    #[test]
    fn test_prefix_flag_wins() {
        let config = config(&[("S3_PREFIX", "env/")]);
        let args = sync_args(&["studio-bridge", "sync", "blondie", "--prefix", "flag/"]);
        assert_eq!(args.key_prefix(&config).unwrap(), "flag/");
    }

    #[test]
    fn test_prefix_falls_back_to_env() {
        let config = config(&[("S3_PREFIX", "env/"), ("DATASET_ROOT", "/d")]);
        let args = sync_args(&["studio-bridge", "sync", "--meta-file", "/x/meta.jsonl"]);

        assert_eq!(args.key_prefix(&config).unwrap(), "env/");
        let sources = args.sources(&config);
        assert_eq!(sources.captions_dir, Some(PathBuf::from("/d/captions")));
        assert_eq!(sources.meta_file, Some(PathBuf::from("/x/meta.jsonl")));
    }

    #[test]
    fn test_missing_prefix() {
        let config = config(&[]);
        let args = sync_args(&["studio-bridge", "sync"]);
        assert!(matches!(
            args.key_prefix(&config),
            Err(ConfigError::Missing("S3_PREFIX"))
        ));
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from(["studio-bridge", "serve", "--port", "8080", "--routes", "status"])
            .unwrap();
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.port, Some(8080));
                assert_eq!(args.routes, Some(RouteSet::Status));
            }
            Command::Sync(_) => panic!("expected serve"),
        }
    }

    #[tokio::test]
    async fn test_sync_without_credentials_fails_before_network() {
        let config = config(&[]);
        let args = sync_args(&["studio-bridge", "sync", "blondie"]);
        let err = run_sync(config, args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MissingCredentials)
        ));
    }
}
