//! foglio: a small self-hosted blog server.
//!
//! Layered the usual way: `domain` holds entities and invariants, `application`
//! holds services and repository traits, `infra` holds the Postgres and HTTP
//! adapters, `presentation` holds the askama view layer.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
