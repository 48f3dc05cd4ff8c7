//! In-memory implementations of the storage traits.
//!
//! [`MemoryCredentialStore`] behaves like a keychain that refuses duplicate
//! entries and can be told to fail, which makes it the fake of choice for
//! session tests. It also backs `--store memory` dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use secrecy::{ExposeSecret, SecretString};
use tracing::trace;

use crate::traits::{CredentialStore, PreferenceError, PreferenceStore, StoreError, StoreOutcome};

/// A credential store kept in process memory.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, SecretString>>,
    add_failure: Mutex<Option<StoreError>>,
    delete_failure: Mutex<Option<StoreError>>,
    add_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock only means a test thread panicked; the data is still usable.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds an entry for `account`.
    pub fn with_entry(account: impl Into<String>, secret: impl Into<String>) -> Self {
        let store = Self::new();
        lock(&store.entries).insert(account.into(), SecretString::from(secret.into()));
        store
    }

    /// Make every subsequent `add` fail with `error`.
    pub fn fail_add(self, error: StoreError) -> Self {
        *lock(&self.add_failure) = Some(error);
        self
    }

    /// Make every subsequent `delete` fail with `error`.
    pub fn fail_delete(self, error: StoreError) -> Self {
        *lock(&self.delete_failure) = Some(error);
        self
    }

    /// The stored secret for `account`, exposed for assertions.
    pub fn secret(&self, account: &str) -> Option<String> {
        lock(&self.entries)
            .get(account)
            .map(|secret| secret.expose_secret().to_string())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns whether the store is empty.
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// Number of `add` calls so far.
    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls so far.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn add(&self, account: &str, secret: &SecretString) -> StoreOutcome {
        self.add_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = lock(&self.add_failure).clone() {
            return StoreOutcome::Error(error);
        }

        let mut entries = lock(&self.entries);
        if entries.contains_key(account) {
            trace!(account = %account, "Duplicate entry");
            return StoreOutcome::DuplicateEntry;
        }
        entries.insert(account.to_string(), secret.clone());
        StoreOutcome::Success
    }

    fn delete(&self, account: &str) -> Result<(), StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = lock(&self.delete_failure).clone() {
            return Err(error);
        }

        lock(&self.entries).remove(account);
        Ok(())
    }

    fn query(&self, account: &str) -> bool {
        lock(&self.entries).contains_key(account)
    }
}

/// Preferences kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<HashMap<String, bool>>,
    writes: AtomicUsize,
}

impl MemoryPreferenceStore {
    /// Create an empty preference store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with one preference already set.
    pub fn with_value(key: impl Into<String>, value: bool) -> Self {
        let store = Self::new();
        lock(&store.values).insert(key.into(), value);
        store
    }

    /// Number of `set_bool` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get_bool(&self, key: &str) -> Option<bool> {
        lock(&self.values).get(key).copied()
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), PreferenceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        lock(&self.values).insert(key.to_string(), value);
        Ok(())
    }
}
