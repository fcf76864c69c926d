//! Secret resolution for credmount
//!
//! `SecretResolver` ties the vault, the local store and an in-process cache
//! together. It resolves batches of named secrets, retries connections with
//! freshly fetched values, updates vault records and writes shell
//! environment files.

pub mod cache;
pub mod connect;
pub mod export;
pub mod resolver;

pub use cache::SecretCache;
pub use connect::ConnectError;
pub use export::{EnvMethod, EnvVar};
pub use resolver::{GetOptions, SecretResolver};

pub use credmount_core::{AccessState, Error, Result, SecretName, SecretRecord, Secrets};
