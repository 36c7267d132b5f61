//! Registry client and data models for a Devhub device-identity registry.
//!
//! Provides typed models and an asynchronous client for the registry's HTTP
//! API: device CRUD, bulk import/export jobs and device-twin retrieval. Each
//! operation is a single stateless request/response exchange.

#![deny(missing_docs)]

pub mod client;
pub mod config;
pub mod models;

pub use client::{Registry, API_VERSION};
pub use config::RegistryConfig;
pub use models::{DeviceInfo, DeviceTwin, JobRequest, JobStatus, JobType};

/// Convenient result alias that reuses the shared Devhub error type.
pub type Result<T> = devhub_core::Result<T>;
