//! Application services layer.

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod notifications;
pub mod orders;
pub mod pagination;
pub mod payments;
pub mod repos;
pub mod subscriptions;
