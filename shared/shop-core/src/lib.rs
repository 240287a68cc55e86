//! Shop Core - Shared domain types and service infrastructure
//!
//! This crate provides:
//! - Standard service trait all microservices must implement
//! - Common domain helpers (tracking codes, digit normalization)
//! - Error handling utilities
//! - Configuration management

pub mod config;
pub mod domain;
pub mod error;
pub mod service;

pub use config::ServiceConfig;
pub use domain::*;
pub use error::{Result, ShopError};
pub use service::{DependencyStatus, HealthStatus, ReadinessStatus, ServiceRuntime, ShopService};
