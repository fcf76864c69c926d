//! Shared constants for credmount

/// Environment variable overriding the local-store root
pub const ENV_STORE_ROOT: &str = "CREDMOUNT_STORE_ROOT";

/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "CREDMOUNT_LOG_LEVEL";

/// Environment variable overriding vault TLS verification
pub const ENV_VERIFY_TLS: &str = "CREDMOUNT_VERIFY_TLS";

/// Environment variable overriding the vault client configuration directory
pub const ENV_VAULT_DIR: &str = "CREDMOUNT_VAULT_DIR";

/// Extension of local-store record files
pub const STORE_FILE_EXTENSION: &str = "json";

/// Mount point used by the tmpfs backend
pub const TMPFS_MOUNT_LOCATION: &str = "/tmpfs-secure";

/// Provisioning program run by the tmpfs backend
pub const TMPFS_MOUNT_SCRIPT: &str = "tmpfs-mount.sh";

/// Directory name of the hidden-directory backend under the home directory
pub const HIDDEN_STORE_DIR: &str = ".credmount";

/// Default file name for generated environment files
pub const ENV_VARS_FILENAME: &str = "credmount_env_vars.bash";
