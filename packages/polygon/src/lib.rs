//! Minimal client for the Polygon problem-preparation API.
//!
//! Only the read-only problem methods needed for migration are wrapped.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
mod signature;

pub use client::PolygonClient;
pub use config::PolygonConfig;
pub use error::PolygonError;
pub use models::{ProblemInfo, Solution, Statement, Test};
