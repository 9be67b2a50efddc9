//! Typed REST endpoints.
//!
//! Each submodule adds methods to [`ApiClient`](crate::session::ApiClient)
//! for one area of the backend.

pub mod access;
pub mod auth;
pub mod hr;
pub mod support;
