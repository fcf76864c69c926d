//! Connecting with secrets that may have been rotated
//!
//! Locally held copies can go stale when a credential is rotated in the
//! vault. A failed connection is therefore retried once with values fetched
//! straight from the vault, and those values replace the local copies only
//! after the retry succeeds.

use crate::resolver::{distinct, GetOptions, SecretResolver};
use credmount_core::{Error, SecretName, Secrets};
use std::fmt;

/// Failure of [`SecretResolver::connect_with_secrets`]
#[derive(Debug)]
pub enum ConnectError<E> {
    /// Secrets could not be resolved
    Resolve(Error),
    /// The connector failed; on a retried connection this is the second error
    Connector(E),
}

impl<E> ConnectError<E> {
    /// The connector's own error, if that is what failed
    pub fn into_connector(self) -> Option<E> {
        match self {
            ConnectError::Connector(e) => Some(e),
            ConnectError::Resolve(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for ConnectError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::Resolve(e) => write!(f, "{e}"),
            ConnectError::Connector(e) => write!(f, "connection failed: {e}"),
        }
    }
}

impl<E> std::error::Error for ConnectError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectError::Resolve(e) => Some(e),
            ConnectError::Connector(e) => Some(e),
        }
    }
}

impl<E> From<Error> for ConnectError<E> {
    fn from(error: Error) -> Self {
        ConnectError::Resolve(error)
    }
}

impl SecretResolver {
    /// Resolve `names` and hand them to `connector`.
    ///
    /// When the connector fails and the local store is usable, every name
    /// is fetched again from the vault alone and the connector runs a second
    /// time. If that succeeds the fresh values are written to the cache and
    /// store; a failed write is logged and the connection is kept. Without
    /// store access the first connector error is returned as is.
    pub fn connect_with_secrets<I, N, T, E, F>(
        &self,
        names: I,
        mut connector: F,
    ) -> Result<T, ConnectError<E>>
    where
        I: IntoIterator<Item = N>,
        N: Into<SecretName>,
        F: FnMut(&Secrets) -> Result<T, E>,
        E: fmt::Display,
    {
        let names = distinct(names);
        let secrets = self.get_secrets(names.iter().cloned(), GetOptions::default())?;

        let first_error = match connector(&secrets) {
            Ok(connection) => return Ok(connection),
            Err(e) => e,
        };
        drop(secrets);

        if !self.current_access()?.is_usable() {
            return Err(ConnectError::Connector(first_error));
        }

        tracing::warn!(
            error = %first_error,
            "connection failed; retrying with secrets fetched from the vault"
        );
        let fresh = names
            .iter()
            .map(|name| Ok((name.clone(), self.fetch_from_vault(name)?)))
            .collect::<Result<Secrets, Error>>()?;

        let connection = connector(&fresh).map_err(ConnectError::Connector)?;
        self.persist(fresh);
        Ok(connection)
    }

    fn persist(&self, secrets: Secrets) {
        for (name, record) in secrets {
            if let Err(e) = self.store().write(&name, &record) {
                tracing::warn!(secret = %name, error = %e, "could not refresh local store copy");
            }
            self.cache().insert(name, record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credmount_config::SharedConfig;
    use credmount_store::{testing::ScriptedBackend, LocalStore};
    use credmount_vault::MemoryVault;
    use tempfile::TempDir;

    fn resolver(access: bool) -> (TempDir, MemoryVault, SecretResolver) {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::present(dir.path().join("store"), access).unwrap();
        let vault = MemoryVault::new();
        let config = SharedConfig::default();
        let store = LocalStore::new(Box::new(backend), config.clone());
        let resolver = SecretResolver::new(Box::new(vault.clone()), store, config).unwrap();
        (dir, vault, resolver)
    }

    #[test]
    fn test_first_attempt_success() {
        let (_dir, vault, resolver) = resolver(true);
        vault.add_secret("db", &[("password", "pw")]);

        let mut attempts = 0;
        let result: Result<String, ConnectError<String>> =
            resolver.connect_with_secrets(["db"], |secrets| {
                attempts += 1;
                Ok(secrets.field("db", "password").unwrap_or_default().to_string())
            });

        assert_eq!(result.unwrap(), "pw");
        assert_eq!(attempts, 1);
        assert_eq!(vault.find_calls("db"), 1);
    }

    #[test]
    fn test_no_retry_without_store_access() {
        let (_dir, vault, resolver) = resolver(false);
        vault.add_secret("db", &[("password", "pw")]);

        let mut attempts = 0;
        let result: Result<(), _> = resolver.connect_with_secrets(["db"], |_| {
            attempts += 1;
            Err("refused")
        });

        assert!(matches!(result, Err(ConnectError::Connector("refused"))));
        assert_eq!(attempts, 1);
        assert_eq!(vault.find_calls("db"), 1);
    }

    #[test]
    fn test_resolve_failure_is_reported() {
        let (_dir, _vault, resolver) = resolver(true);

        let result: Result<(), ConnectError<String>> =
            resolver.connect_with_secrets(["missing"], |_| Ok(()));

        match result {
            Err(ConnectError::Resolve(e)) => assert!(e.is_not_found()),
            other => panic!("expected resolve error, got {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let err: ConnectError<&str> = ConnectError::Connector("timed out");
        assert_eq!(err.to_string(), "connection failed: timed out");
        assert_eq!(err.into_connector(), Some("timed out"));
    }
}
