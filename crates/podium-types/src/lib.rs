//! Shared types for the podium backend.
//!
//! `models` holds the canonical entity shapes returned by the API;
//! `api` holds request bodies, query params and small response wrappers.
//! Keeping them here lets podium-api and external clients agree on one
//! wire format without pulling in the storage layer.

pub mod api;
pub mod models;

pub use api::*;
pub use models::*;
