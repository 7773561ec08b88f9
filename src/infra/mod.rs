//! Infrastructure adapters and runtime bootstrap.

pub mod backend;
pub mod error;
pub mod navigation;
pub mod notify;
pub mod telemetry;
