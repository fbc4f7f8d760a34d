//! service-core: Shared infrastructure for the chat service.
pub mod config;
pub mod error;
pub mod observability;
