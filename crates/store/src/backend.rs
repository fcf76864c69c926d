//! Platform capability for the persistent local store

use credmount_config::SharedConfig;
use credmount_core::{Error, Result, SecretName, STORE_FILE_EXTENSION};
use credmount_utils::CommandExecutor;
use std::path::{Path, PathBuf};

/// Outcome of one provisioning attempt
#[derive(Debug)]
pub enum ProvisionResult {
    /// The store was created
    Success,
    /// The caller lacks the privileges to create the store; not an error
    PermissionDenied,
    /// Anything else; the environment is broken
    Fatal(Error),
}

/// Per-platform operations on the local store.
///
/// One implementation is chosen at process start; nothing else in the
/// workspace branches on the platform.
pub trait MountBackend: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Store root used when no `store_root` is configured
    fn default_root(&self) -> PathBuf;

    /// Whether the store exists at `root`
    fn determine_exists(&self, root: &Path) -> bool;

    /// Whether this process may list the store.
    ///
    /// A permission error means `false`; any other listing failure is an error.
    fn determine_access(&self, root: &Path) -> Result<bool> {
        match std::fs::read_dir(root) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(false),
            Err(e) => Err(Error::file_system(root, "list local store", e)),
        }
    }

    /// Attempt to create the store at `root`
    fn provision(&self, root: &Path) -> ProvisionResult;

    /// Characters replaced with `_` in on-disk file names
    fn path_separators(&self) -> &'static [char] {
        &['/']
    }

    /// Location of the file holding `name`
    fn secret_path_for(&self, root: &Path, name: &SecretName) -> PathBuf {
        root.join(format!(
            "{}.{}",
            name.storage_name(self.path_separators()),
            STORE_FILE_EXTENSION
        ))
    }
}

/// Backend for the platform this process runs on
#[cfg(target_os = "linux")]
pub fn platform_backend(
    config: SharedConfig,
    executor: Box<dyn CommandExecutor>,
) -> Box<dyn MountBackend> {
    Box::new(crate::tmpfs::TmpfsMount::new(config, executor))
}

/// Backend for the platform this process runs on
#[cfg(not(target_os = "linux"))]
pub fn platform_backend(
    config: SharedConfig,
    executor: Box<dyn CommandExecutor>,
) -> Box<dyn MountBackend> {
    let _ = config;
    Box::new(crate::hidden_dir::HiddenDirectory::new(executor))
}
