// Studio Bridge - MaxStudio CORS relay and S3 dataset sync

pub mod config;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod storage;
pub mod sync;

// Re-exports for convenience
pub use config::Config;
pub use proxy::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
