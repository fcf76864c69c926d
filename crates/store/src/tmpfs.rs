//! tmpfs-backed local store
//!
//! The store is a RAM-backed mount created by a privileged script. Only the
//! user who provisioned it can list it; everybody else falls back to the
//! vault.

use crate::backend::{MountBackend, ProvisionResult};
use credmount_config::SharedConfig;
use credmount_core::{Error, TMPFS_MOUNT_LOCATION};
use credmount_utils::CommandExecutor;
use once_cell::sync::Lazy;
use regex::Regex;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

static PERMISSION_DENIED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)permission denied").expect("static regex is valid"));

/// Local store on a tmpfs mount point
pub struct TmpfsMount {
    config: SharedConfig,
    executor: Box<dyn CommandExecutor>,
}

impl TmpfsMount {
    /// Create the backend; the mount script is read from `config` on every
    /// provisioning attempt
    pub fn new(config: SharedConfig, executor: Box<dyn CommandExecutor>) -> Self {
        Self { config, executor }
    }
}

impl MountBackend for TmpfsMount {
    fn name(&self) -> &'static str {
        "tmpfs"
    }

    fn default_root(&self) -> PathBuf {
        PathBuf::from(TMPFS_MOUNT_LOCATION)
    }

    fn determine_exists(&self, root: &Path) -> bool {
        is_mount_point(root)
    }

    fn provision(&self, root: &Path) -> ProvisionResult {
        let script = self.config.mount_script();
        tracing::info!(
            script = %script,
            root = %root.display(),
            "provisioning tmpfs local store"
        );

        let output = match self.executor.execute(&script, &[]) {
            Ok(output) => output,
            Err(e) => return ProvisionResult::Fatal(e),
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim_end();
        if !combined.is_empty() {
            tracing::info!("{combined}");
        }

        if output.status.success() {
            ProvisionResult::Success
        } else if PERMISSION_DENIED.is_match(combined) {
            ProvisionResult::PermissionDenied
        } else {
            let status = output
                .status
                .code()
                .map_or_else(|| "a signal".to_string(), |code| format!("exit code {code}"));
            ProvisionResult::Fatal(Error::provisioning_fatal(
                self.name(),
                format!("'{script}' terminated with {status}: {combined}"),
            ))
        }
    }
}

/// Whether `path` is the root of a mounted filesystem
fn is_mount_point(path: &Path) -> bool {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return false;
    };
    if !meta.is_dir() {
        return false;
    }
    match std::fs::metadata(path.join("..")) {
        // A different device, or the same inode as the parent at `/`
        Ok(parent) => parent.dev() != meta.dev() || parent.ino() == meta.ino(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credmount_utils::TestCommandExecutor;
    use serde_json::json;
    use tempfile::TempDir;

    fn backend(executor: &TestCommandExecutor) -> TmpfsMount {
        let config = SharedConfig::default();
        config
            .set(credmount_config::OPT_MOUNT_SCRIPT, json!("/opt/credmount/tmpfs-mount.sh"))
            .unwrap();
        TmpfsMount::new(config, Box::new(executor.clone()))
    }

    #[test]
    fn test_root_is_a_mount_point() {
        assert!(is_mount_point(Path::new("/")));
    }

    #[test]
    fn test_plain_directory_is_not_a_mount_point() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        assert!(!is_mount_point(&nested));
        assert!(!is_mount_point(&dir.path().join("missing")));
    }

    #[test]
    fn test_provision_success() {
        let executor = TestCommandExecutor::new();
        executor.add_simple_response("/opt/credmount/tmpfs-mount.sh", &[], "mounted\n");

        let result = backend(&executor).provision(Path::new(TMPFS_MOUNT_LOCATION));
        assert!(matches!(result, ProvisionResult::Success));
        assert_eq!(executor.call_count("/opt/credmount/tmpfs-mount.sh", &[]), 1);
    }

    #[test]
    fn test_provision_permission_denied_is_soft() {
        let executor = TestCommandExecutor::new();
        executor.add_error_response(
            "/opt/credmount/tmpfs-mount.sh",
            &[],
            "sudo: mount: Permission Denied\n",
            1,
        );

        let result = backend(&executor).provision(Path::new(TMPFS_MOUNT_LOCATION));
        assert!(matches!(result, ProvisionResult::PermissionDenied));
    }

    #[test]
    fn test_provision_other_failure_is_fatal() {
        let executor = TestCommandExecutor::new();
        executor.add_error_response(
            "/opt/credmount/tmpfs-mount.sh",
            &[],
            "mount: unknown filesystem type",
            32,
        );

        match backend(&executor).provision(Path::new(TMPFS_MOUNT_LOCATION)) {
            ProvisionResult::Fatal(Error::ProvisioningFatal { backend, message }) => {
                assert_eq!(backend, "tmpfs");
                assert!(message.contains("exit code 32"));
                assert!(message.contains("unknown filesystem type"));
            }
            other => panic!("expected fatal provisioning error, got {other:?}"),
        }
    }

    #[test]
    fn test_provision_spawn_failure_is_fatal() {
        let executor = TestCommandExecutor::new();
        let result = backend(&executor).provision(Path::new(TMPFS_MOUNT_LOCATION));
        assert!(matches!(
            result,
            ProvisionResult::Fatal(Error::CommandExecution { .. })
        ));
    }
}
