//! Core domain types, errors, and constants for credmount.
//!
//! - **`errors`**: the `Error` enum and `Result` alias shared by every tier.
//! - **`types`**: `SecretName`, `SecretRecord`, `Secrets` and `AccessState`.
//! - **`constants`**: environment variable names and default locations.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result},
    types::*,
};
