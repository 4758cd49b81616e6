//! Recipe marketplace backend.
//!
//! Layers, innermost first: `domain` (entities and field rules),
//! `application` (services over repository traits), `cache` (the listing
//! result cache), `infra` (Postgres, HTTP, payments, notifications) and
//! `config`.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
