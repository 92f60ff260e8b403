//! HTTP and WebSocket front door for classroom sessions.
//!
//! Every handler forwards to [`classroom_coordination::Classroom`]; this
//! crate only maps requests, errors and the push stream.

pub mod config;
pub mod error;
pub mod routes;
pub mod ws;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::app;
