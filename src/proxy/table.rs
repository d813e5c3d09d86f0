//! Route table mapping inbound paths onto upstream endpoints.

use serde::Deserialize;
use std::str::FromStr;

/// How an inbound path is matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    /// `/prefix` itself or anything below `/prefix/`.
    Prefix(&'static str),
    /// `/prefix/{id}` with exactly one non-empty segment after the prefix.
    WithId(&'static str),
}

impl PathMatcher {
    /// On a match, returns the captured id (empty for [`PathMatcher::Prefix`]).
    fn capture<'p>(&self, path: &'p str) -> Option<&'p str> {
        match self {
            PathMatcher::Prefix(prefix) => {
                let rest = path.strip_prefix(prefix)?;
                (rest.is_empty() || rest.starts_with('/')).then_some("")
            }
            PathMatcher::WithId(prefix) => {
                let id = path.strip_prefix(prefix)?.strip_prefix('/')?;
                (!id.is_empty() && !id.contains('/')).then_some(id)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub matcher: PathMatcher,
    /// Upstream path; `{id}` is replaced by the captured id.
    pub upstream_path: &'static str,
}

impl Route {
    pub const fn prefix(prefix: &'static str, upstream_path: &'static str) -> Self {
        Self {
            matcher: PathMatcher::Prefix(prefix),
            upstream_path,
        }
    }

    pub const fn with_id(prefix: &'static str, upstream_path: &'static str) -> Self {
        Self {
            matcher: PathMatcher::WithId(prefix),
            upstream_path,
        }
    }
}

/// Which routes a deployment exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RouteSet {
    /// All five MaxStudio endpoints.
    Full,
    /// Only the enhancement status lookup.
    Status,
}

impl FromStr for RouteSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(RouteSet::Full),
            "status" => Ok(RouteSet::Status),
            other => Err(format!("expected `full` or `status`, got `{}`", other)),
        }
    }
}

const ENHANCE_STATUS: Route = Route::with_id("/enhance-status", "/image-enhancer/{id}");

/// Id routes come before their bare prefix.
const FULL_ROUTES: [Route; 5] = [
    ENHANCE_STATUS,
    Route::prefix("/enhance", "/image-enhancer"),
    Route::prefix("/detect", "/detect-face-image"),
    Route::with_id("/swap-status", "/faceswap/{id}"),
    Route::prefix("/swap", "/faceswap"),
];

/// Ordered routes; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    base_path: String,
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            base_path: String::new(),
            routes,
        }
    }

    pub fn for_set(set: RouteSet) -> Self {
        match set {
            RouteSet::Full => Self::new(FULL_ROUTES.to_vec()),
            RouteSet::Status => Self::new(vec![ENHANCE_STATUS]),
        }
    }

    /// Mount every route below `base_path` (e.g. `/api`). `api`, `/api` and
    /// `/api/` all mount at `/api`.
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        let trimmed = base_path.trim_matches('/');
        self.base_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Upstream path for `path`, or `None` when nothing matches.
    pub fn resolve(&self, path: &str) -> Option<String> {
        let path = path.strip_prefix(self.base_path.as_str())?;
        self.routes.iter().find_map(|route| {
            route
                .matcher
                .capture(path)
                .map(|id| route.upstream_path.replace("{id}", id))
        })
    }
}
