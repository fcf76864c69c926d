use std::path::PathBuf;

/// Result type alias for credmount operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for credmount operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Zero or several vault records carry the requested name
    #[error("{}", format_not_found(.name, *.matches))]
    NotFound { name: String, matches: usize },

    /// A vault field carries more than one value
    #[error(
        "multiple values appear for secret record '{record}' {section} '{field}'; \
         inspect the raw vault record and parse it manually"
    )]
    MultiValue {
        record: String,
        section: String,
        field: String,
    },

    /// A local-store file exists but does not hold a valid record
    #[error("local store record for secret '{name}' at '{path}' is malformed: {source}")]
    MalformedStoreRecord {
        name: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Provisioning the local store failed for a reason other than permissions
    #[error("failed to provision local store with {backend}: {message}")]
    ProvisioningFatal { backend: String, message: String },

    /// Vault client errors that are not lookup failures
    #[error("vault error: {message}")]
    Vault { message: String },

    /// Command execution errors
    #[error("{}", format_command_error(.command, .args, .message, .exit_code))]
    CommandExecution {
        command: String,
        args: Vec<String>,
        message: String,
        exit_code: Option<i32>,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

fn format_not_found(name: &str, matches: usize) -> String {
    if matches == 0 {
        format!("secret record '{name}' was not found by this application")
    } else {
        format!("'{name}' belongs to {matches} records; rename them so the title is unique")
    }
}

fn format_command_error(
    command: &str,
    args: &[String],
    message: &str,
    exit_code: &Option<i32>,
) -> String {
    let args_str = args.join(" ");
    let invocation = if args_str.is_empty() {
        command.to_string()
    } else {
        format!("{command} {args_str}")
    };
    match exit_code {
        Some(code) => format!("command '{invocation}' failed with exit code {code}: {message}"),
        None => format!("command '{invocation}' failed: {message}"),
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a not-found error for a secret name with `matches` vault hits
    #[must_use]
    pub fn not_found(name: impl Into<String>, matches: usize) -> Self {
        Error::NotFound {
            name: name.into(),
            matches,
        }
    }

    /// Create a multi-value field error
    #[must_use]
    pub fn multi_value(
        record: impl Into<String>,
        section: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Error::MultiValue {
            record: record.into(),
            section: section.into(),
            field: field.into(),
        }
    }

    /// Create a malformed store record error
    #[must_use]
    pub fn malformed_store_record(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Error::MalformedStoreRecord {
            name: name.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a fatal provisioning error
    #[must_use]
    pub fn provisioning_fatal(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ProvisioningFatal {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a vault error
    #[must_use]
    pub fn vault(message: impl Into<String>) -> Self {
        Error::Vault {
            message: message.into(),
        }
    }

    /// Create a command execution error
    #[must_use]
    pub fn command_execution(
        command: impl Into<String>,
        args: Vec<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Error::CommandExecution {
            command: command.into(),
            args,
            message: message.into(),
            exit_code,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Whether this error is a not-found lookup failure
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// The secret name carried by lookup and parse errors, if any
    #[must_use]
    pub fn secret_name(&self) -> Option<&str> {
        match self {
            Error::NotFound { name, .. } | Error::MalformedStoreRecord { name, .. } => Some(name),
            Error::MultiValue { record, .. } => Some(record),
            _ => None,
        }
    }
}
