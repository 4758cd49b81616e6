//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod http;
pub mod notifications;
pub mod payments;
pub mod telemetry;
