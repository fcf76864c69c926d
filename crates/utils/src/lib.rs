//! Shared utilities for credmount
//!
//! Atomic file writes, XDG locations, the external command seam and the
//! tracing subscriber setup used by the binary.

pub mod atomic_file;
pub mod command;
pub mod tracing;
pub mod xdg;

pub use atomic_file::*;
pub use command::*;
pub use xdg::*;
