//! Persistent local secret store for credmount
//!
//! Secrets live as one JSON file per name under a store root. How the root
//! is detected and created depends on the platform: a tmpfs mount on Linux,
//! a hidden directory in the user's home elsewhere.

pub mod backend;
pub mod hidden_dir;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
#[cfg(unix)]
pub mod tmpfs;

pub use backend::{platform_backend, MountBackend, ProvisionResult};
pub use hidden_dir::HiddenDirectory;
pub use store::LocalStore;
#[cfg(unix)]
pub use tmpfs::TmpfsMount;
