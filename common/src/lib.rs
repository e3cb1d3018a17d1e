//! Shared building blocks for the database chat service.
//!
//! Holds configuration loading, the error taxonomy, the API response
//! envelope, HTTP middleware and the data models exchanged between the
//! pipeline components.

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
