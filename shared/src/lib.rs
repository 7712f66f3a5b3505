//! Shared library for the tour schedule proxy Lambda.
//!
//! This crate provides the error type, configuration, response helpers, the
//! RocketRez client and the schedule normalizer used by the Lambda binary.

pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod normalizer;
pub mod upstream;

pub use config::Config;
pub use error::{Error, Result};
pub use models::{
    CustomFields, DebugInfo, NormalizedSchedule, ProxyErrorBody, ScheduleResponse,
    UpstreamErrorBody, UsageError,
};
pub use normalizer::{normalize_schedules, normalize_schedules_at};
pub use upstream::{RocketRezClient, ScheduleQuery};
