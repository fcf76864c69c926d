//! Vault access for credmount
//!
//! The vault is the system of record. Its records carry typed, optionally
//! labelled fields with lists of values; this crate flattens them into
//! `SecretRecord`s and applies field updates before saving.

pub mod client;
pub mod command;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod record;

pub use client::{fetch_unique, VaultClient};
pub use command::CommandVault;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryVault;
pub use record::{RawField, RawRecord, Section, CUSTOM_FIELD_TYPE};
