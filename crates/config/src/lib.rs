//! Configuration management for credmount
//!
//! `Settings` holds the recognized options, `SharedConfig` is the mutable
//! handle passed to every tier, and `ConfigLoader` assembles startup values.

pub mod loader;
pub mod settings;
pub mod shared;

pub use loader::*;
pub use settings::*;
pub use shared::*;
