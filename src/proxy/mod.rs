//! MaxStudio relay
//!
//! Browser clients cannot call the MaxStudio API directly: it has no CORS
//! support and requires a secret key. The relay accepts the same requests on
//! a small set of paths, attaches the key server-side and returns the
//! upstream answer with permissive CORS headers.
//!
//! | Inbound                  | Upstream                  |
//! |--------------------------|---------------------------|
//! | `/enhance`               | `/image-enhancer`         |
//! | `/enhance-status/{id}`   | `/image-enhancer/{id}`    |
//! | `/detect`                | `/detect-face-image`      |
//! | `/swap`                  | `/faceswap`               |
//! | `/swap-status/{id}`      | `/faceswap/{id}`          |

pub mod table;
pub mod upstream;

use std::sync::Arc;

use crate::config::{Config, ConfigError};

pub use table::{PathMatcher, Route, RouteSet, RouteTable};
pub use upstream::{ProxyError, Upstream, UpstreamResponse};

/// Shared, read-only state for every request.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub upstream: Upstream,
}

impl AppState {
    pub fn new(routes: RouteTable, upstream: Upstream) -> Self {
        Self {
            routes: Arc::new(routes),
            upstream,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let routes =
            RouteTable::for_set(config.server.routes).with_base_path(&config.server.base_path);
        let upstream = Upstream::from_config(&config.upstream)?;
        Ok(Self::new(routes, upstream))
    }
}
