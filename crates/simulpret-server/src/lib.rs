//! HTTP surface for the mortgage simulation engine

pub mod config;
pub mod error;
pub mod http;
pub mod state;

pub use config::ServerConfig;
pub use error::ServerError;
pub use http::create_router;
pub use state::AppState;
