//! Application services and the collaborator seams they depend on.

pub mod composer;
pub mod error;
pub mod gate;
pub mod guard;
pub mod metrics;
pub mod navigation;
pub mod notify;
pub mod repos;
pub mod session;
pub mod uploads;
