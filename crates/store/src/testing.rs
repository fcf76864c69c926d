//! Scripted backend for exercising store and resolver logic

use crate::backend::{MountBackend, ProvisionResult};
use credmount_core::{Error, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What the next provisioning attempt does
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Create the root directory and report success
    Create,
    /// Report a permission refusal without touching the filesystem
    PermissionDenied,
    /// Report a fatal failure with this message
    Fatal(String),
}

#[derive(Debug)]
struct State {
    exists: bool,
    access: bool,
    outcome: ScriptedOutcome,
    provision_calls: usize,
}

/// Backend whose existence, access and provisioning are set by the test.
///
/// The scripted state applies to the backend's own root; any other root
/// exists when it is a directory on disk. Clones share state, so a test keeps
/// one clone as a handle after boxing another into a store.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    root: PathBuf,
    state: Arc<Mutex<State>>,
}

impl ScriptedBackend {
    /// A store that does not exist yet and builds with full access
    pub fn absent(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: Arc::new(Mutex::new(State {
                exists: false,
                access: true,
                outcome: ScriptedOutcome::Create,
                provision_calls: 0,
            })),
        }
    }

    /// A store that already exists, with or without access
    pub fn present(root: impl Into<PathBuf>, access: bool) -> Result<Self> {
        let backend = Self::absent(root);
        std::fs::create_dir_all(&backend.root)
            .map_err(|e| Error::file_system(&backend.root, "create scripted store", e))?;
        backend.make_present(access);
        Ok(backend)
    }

    /// Mark the store as existing
    pub fn make_present(&self, access: bool) {
        let mut state = self.state.lock();
        state.exists = true;
        state.access = access;
    }

    pub fn set_outcome(&self, outcome: ScriptedOutcome) {
        self.state.lock().outcome = outcome;
    }

    pub fn provision_calls(&self) -> usize {
        self.state.lock().provision_calls
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl MountBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn default_root(&self) -> PathBuf {
        self.root.clone()
    }

    fn determine_exists(&self, root: &Path) -> bool {
        if root == self.root {
            self.state.lock().exists
        } else {
            root.is_dir()
        }
    }

    fn determine_access(&self, _root: &Path) -> Result<bool> {
        Ok(self.state.lock().access)
    }

    fn provision(&self, root: &Path) -> ProvisionResult {
        let mut state = self.state.lock();
        state.provision_calls += 1;
        match state.outcome.clone() {
            ScriptedOutcome::Create => {
                if let Err(e) = std::fs::create_dir_all(root) {
                    return ProvisionResult::Fatal(Error::file_system(
                        root,
                        "create scripted store",
                        e,
                    ));
                }
                state.exists = true;
                ProvisionResult::Success
            }
            ScriptedOutcome::PermissionDenied => ProvisionResult::PermissionDenied,
            ScriptedOutcome::Fatal(message) => {
                ProvisionResult::Fatal(Error::provisioning_fatal("scripted", message))
            }
        }
    }
}
