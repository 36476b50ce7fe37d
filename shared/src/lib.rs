//! Shared library for the school reports services
//!
//! Common functionality used by every service binary:
//! - Configuration loaded from the environment
//! - The error taxonomy and its HTTP rendering
//! - JWT validation/issuance and the role permission table

pub mod auth;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use auth::{Claims, Permission, Role, TokenService};
pub use config::Config;
pub use error::{AppError, ErrorResponse, Result};
