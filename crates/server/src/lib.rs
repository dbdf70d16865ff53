//! Server crate for the affinity recommendation engine.
//!
//! Wraps a trained similarity model in a read-only service and exposes it
//! over HTTP. The model is loaded once at startup and shared by every
//! request handler.

pub mod config;
pub mod routes;
pub mod service;

pub use config::{IndexMapping, ServerConfig, ServiceConfig};
pub use routes::{router, serve};
pub use service::{Recommendation, RecommendationService, ServiceError, UserKey};
