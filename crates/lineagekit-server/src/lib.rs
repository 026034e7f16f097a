//! LineageKit HTTP service library.
//!
//! This module exposes internal types for testing purposes.
//! The main entry point is the `lineagekit` binary.

pub mod admission;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod projector;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use admission::{AdmissionController, AdmissionDecision};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use server::{build_router, run_server, AppState};
