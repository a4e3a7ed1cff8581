//! v1 API Data Transfer Objects.
//!
//! Wire format for the v1 REST API, kept separate from the domain models in
//! `src/models/`. Shared by the server handlers and the HTTP client.

pub mod common;
pub mod family;

pub use family::*;
