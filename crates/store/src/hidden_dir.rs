//! Hidden per-user directory store
//!
//! Used where no tmpfs mount is provisioned. Creating the directory needs no
//! special privileges; access is limited to the owning user.

use crate::backend::{MountBackend, ProvisionResult};
use credmount_core::{Error, HIDDEN_STORE_DIR};
use credmount_utils::{CommandExecutor, XdgPaths};
use std::path::{Path, PathBuf};

/// Local store in a hidden directory under the user's home
pub struct HiddenDirectory {
    #[cfg_attr(not(windows), allow(dead_code))]
    executor: Box<dyn CommandExecutor>,
}

impl HiddenDirectory {
    /// Create the backend; `executor` runs `attrib` on Windows
    pub fn new(executor: Box<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    #[cfg(unix)]
    fn restrict(&self, root: &Path) -> Result<(), Error> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(root, std::fs::Permissions::from_mode(0o700))
            .map_err(|e| Error::file_system(root, "restrict local store permissions", e))
    }

    #[cfg(windows)]
    fn restrict(&self, root: &Path) -> Result<(), Error> {
        let args = vec!["+h".to_string(), root.display().to_string()];
        let output = self.executor.execute("attrib", &args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::info!("{}", stdout.trim_end());
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!("{}", stderr.trim_end());
            return Err(Error::command_execution(
                "attrib",
                args,
                stderr.trim().to_string(),
                output.status.code(),
            ));
        }
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn restrict(&self, _root: &Path) -> Result<(), Error> {
        Ok(())
    }
}

impl MountBackend for HiddenDirectory {
    fn name(&self) -> &'static str {
        "hidden-directory"
    }

    fn default_root(&self) -> PathBuf {
        XdgPaths::home_dir().join(HIDDEN_STORE_DIR)
    }

    fn determine_exists(&self, root: &Path) -> bool {
        root.is_dir()
    }

    fn path_separators(&self) -> &'static [char] {
        &['/', '\\']
    }

    fn provision(&self, root: &Path) -> ProvisionResult {
        if root.exists() {
            return ProvisionResult::Success;
        }

        match std::fs::create_dir_all(root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                tracing::debug!(root = %root.display(), error = %e, "cannot create local store");
                return ProvisionResult::PermissionDenied;
            }
            Err(e) => {
                return ProvisionResult::Fatal(Error::file_system(
                    root,
                    "create local store",
                    e,
                ))
            }
        }

        if let Err(e) = self.restrict(root) {
            return ProvisionResult::Fatal(e);
        }

        tracing::info!(root = %root.display(), "hidden secrets directory built");
        ProvisionResult::Success
    }
}
