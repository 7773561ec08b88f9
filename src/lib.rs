//! Folio: authoring core for a small hosted blog.
//!
//! The crate is split the usual way: `domain` holds pure types and rules,
//! `application` the services and the seams they talk through, `infra` the
//! concrete adapters and `config` the layered settings.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub(crate) mod util;
