//! Common library for the Pagesmith services
//!
//! This crate provides functionality shared by the authentication and API
//! services: the role model and access-control gate, token verification,
//! database connectivity, the Redis cache and error types.

pub mod access;
pub mod cache;
pub mod database;
pub mod error;
pub mod identity;
pub mod token;

pub use access::{Action, Denial, Ownership, ResourceKind, authorize};
pub use identity::{Principal, Role};
pub use token::TokenVerifier;
