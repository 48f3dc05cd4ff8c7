//! Trait definitions for pluggable components.
//!
//! These traits define the interfaces for:
//! - Secure credential storage (OS keychain, in-memory)
//! - The persisted "remember" preference
//! - Dialog presentation (terminal, GTK4, scripted mock)
//!
//! The session only ever talks to these traits, so tests can substitute
//! fakes for every collaborator.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::mpsc::UnboundedSender;

use crate::session::{Intent, SessionView};

/// A failure reported by the credential store.
///
/// `message` is the store's own text and is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    /// Store-specific status code.
    pub code: i32,
    /// Human readable message from the store.
    pub message: String,
}

impl StoreError {
    /// Create a new store error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Result of adding an entry to the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The entry was stored.
    Success,
    /// An entry for the account already exists and was left untouched.
    DuplicateEntry,
    /// Any other failure.
    Error(StoreError),
}

/// Error type for preference persistence.
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    /// Failed to read or write the preference file.
    #[error("preference I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The preference file is not valid JSON.
    #[error("invalid preference file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Error type for presentation adapters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PromptError {
    /// Failed to initialize the UI toolkit or terminal.
    #[error("UI initialization failed: {0}")]
    InitializationFailed(String),

    /// Generic UI error.
    #[error("UI error: {0}")]
    UiError(String),
}

/// Capability interface over a secure OS credential vault.
///
/// Implementations must never overwrite an existing entry from `add`; the
/// session resolves duplicates by asking the user and calling `delete`
/// first.
pub trait CredentialStore: Send + Sync {
    /// Store `secret` for `account`.
    fn add(&self, account: &str, secret: &SecretString) -> StoreOutcome;

    /// Delete the entry for `account`. Deleting a missing entry succeeds.
    fn delete(&self, account: &str) -> Result<(), StoreError>;

    /// Returns whether an entry exists for `account`.
    fn query(&self, account: &str) -> bool;
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn add(&self, account: &str, secret: &SecretString) -> StoreOutcome {
        (**self).add(account, secret)
    }

    fn delete(&self, account: &str) -> Result<(), StoreError> {
        (**self).delete(account)
    }

    fn query(&self, account: &str) -> bool {
        (**self).query(account)
    }
}

impl<T: CredentialStore + ?Sized> CredentialStore for Box<T> {
    fn add(&self, account: &str, secret: &SecretString) -> StoreOutcome {
        (**self).add(account, secret)
    }

    fn delete(&self, account: &str) -> Result<(), StoreError> {
        (**self).delete(account)
    }

    fn query(&self, account: &str) -> bool {
        (**self).query(account)
    }
}

/// Boolean key/value preference storage.
pub trait PreferenceStore: Send + Sync {
    /// Read a preference, `None` if it was never set.
    fn get_bool(&self, key: &str) -> Option<bool>;

    /// Persist a preference.
    fn set_bool(&self, key: &str, value: bool) -> Result<(), PreferenceError>;
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for Arc<T> {
    fn get_bool(&self, key: &str) -> Option<bool> {
        (**self).get_bool(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), PreferenceError> {
        (**self).set_bool(key, value)
    }
}

/// Trait for dialog implementations.
///
/// A presenter renders [`SessionView`] snapshots and translates user actions
/// into [`Intent`]s sent through the channel handed to [`Presenter::open`].
/// All methods are called from the runner's event loop and must not block.
///
/// # Example (Mock Implementation)
///
/// ```ignore
/// struct AcceptingPresenter;
///
/// impl Presenter for AcceptingPresenter {
///     fn open(&mut self, _view: &SessionView, events: UnboundedSender<Intent>) -> Result<(), PromptError> {
///         let _ = events.send(Intent::Accept);
///         Ok(())
///     }
///     fn render(&mut self, _view: &SessionView) {}
///     fn confirm_replace(&mut self, _account: &str) {}
///     fn show_error(&mut self, _title: &str, _message: &str) {}
///     fn close(&mut self) {}
/// }
/// ```
pub trait Presenter: Send {
    /// Show the dialog for the initial view.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::InitializationFailed` if the UI cannot be shown.
    fn open(&mut self, view: &SessionView, events: UnboundedSender<Intent>)
        -> Result<(), PromptError>;

    /// Reflect a changed view (countdown label, focus, checkbox).
    fn render(&mut self, view: &SessionView);

    /// Ask whether the existing entry for `account` should be replaced.
    ///
    /// The answer comes back as [`Intent::ResolveDuplicate`].
    fn confirm_replace(&mut self, account: &str);

    /// Show a modal error notification.
    fn show_error(&mut self, title: &str, message: &str);

    /// Tear the dialog down. Called exactly once, after the outcome is known.
    fn close(&mut self);
}
