//! OS credential vault backed by the `keyring` crate.
//!
//! Entries are keyed by `(service, account)` where the account is the key
//! path the passphrase unlocks. The default service is `SSH`.

use keyring::Entry;
use secrecy::{ExposeSecret, SecretString};
use ssh_askpass_core::{CredentialStore, StoreError, StoreOutcome};
use tracing::{debug, trace};

/// Service name used when none is configured.
pub const DEFAULT_SERVICE: &str = "SSH";

/// Credential store over the platform keychain.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Create a store for `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// The service name entries are stored under.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, account: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service, account).map_err(store_error)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

/// Map a keyring error to a stable code plus the library's message.
pub fn store_error(error: keyring::Error) -> StoreError {
    let code = match &error {
        keyring::Error::PlatformFailure(_) => 1,
        keyring::Error::NoStorageAccess(_) => 2,
        keyring::Error::NoEntry => 3,
        keyring::Error::BadEncoding(_) => 4,
        keyring::Error::TooLong(_, _) => 5,
        keyring::Error::Invalid(_, _) => 6,
        keyring::Error::Ambiguous(_) => 7,
        _ => -1,
    };
    StoreError::new(code, error.to_string())
}

impl CredentialStore for KeyringStore {
    fn add(&self, account: &str, secret: &SecretString) -> StoreOutcome {
        let entry = match self.entry(account) {
            Ok(entry) => entry,
            Err(e) => return StoreOutcome::Error(e),
        };

        // keyring overwrites silently, so look first.
        match entry.get_password() {
            Ok(_) => {
                debug!(service = %self.service, account = %account, "Keychain entry exists");
                return StoreOutcome::DuplicateEntry;
            }
            Err(keyring::Error::NoEntry) => {}
            Err(e) => return StoreOutcome::Error(store_error(e)),
        }

        match entry.set_password(secret.expose_secret()) {
            Ok(()) => {
                debug!(service = %self.service, account = %account, "Keychain entry added");
                StoreOutcome::Success
            }
            Err(e) => StoreOutcome::Error(store_error(e)),
        }
    }

    fn delete(&self, account: &str) -> Result<(), StoreError> {
        match self.entry(account)?.delete_credential() {
            Ok(()) => {
                debug!(service = %self.service, account = %account, "Keychain entry deleted");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                trace!(account = %account, "Nothing to delete");
                Ok(())
            }
            Err(e) => Err(store_error(e)),
        }
    }

    fn query(&self, account: &str) -> bool {
        self.entry(account)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_service_is_ssh() {
        assert_eq!(KeyringStore::default().service(), "SSH");
        assert_eq!(KeyringStore::new("custom").service(), "custom");
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(store_error(keyring::Error::NoEntry).code, 3);
        assert_eq!(
            store_error(keyring::Error::BadEncoding(vec![0xff])).code,
            4
        );
        assert_eq!(
            store_error(keyring::Error::TooLong("account".into(), 255)).code,
            5
        );

        let err = store_error(keyring::Error::Invalid("service".into(), "empty".into()));
        assert_eq!(err.code, 6);
        assert!(!err.message.is_empty());
    }

    // Talks to the real platform keychain.
    #[test]
    #[ignore = "requires a platform keychain"]
    fn add_duplicate_delete_round() {
        let store = KeyringStore::new("ssh-askpass-test");
        let account = "/tmp/ssh-askpass-test-key";
        let _ = store.delete(account);

        let secret = SecretString::from("hunter2");
        assert_eq!(store.add(account, &secret), StoreOutcome::Success);
        assert!(store.query(account));
        assert_eq!(store.add(account, &secret), StoreOutcome::DuplicateEntry);
        assert!(store.delete(account).is_ok());
        assert!(!store.query(account));
        assert!(store.delete(account).is_ok());
    }
}
