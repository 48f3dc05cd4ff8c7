//! Core types and state machine for ssh-askpass.
//!
//! This crate holds everything about a credential prompt that does not
//! depend on a UI toolkit or on a real keychain: the prompt session state
//! machine, the auto-cancel countdown, prompt detection, configuration and
//! the storage traits with in-memory and file-backed implementations.
//!
//! # Modules
//!
//! - [`types`]: Prompt variants, requests and outcomes
//! - [`session`]: The `PromptSession` state machine
//! - [`countdown`]: Auto-cancel countdown and its cancellation token
//! - [`detect`]: Variant and account detection from prompt text
//! - [`traits`]: Store, preference and presenter traits
//! - [`memory`]: In-memory store implementations
//! - [`preferences`]: JSON file preference store
//! - [`config`]: TOML configuration
//!
//! # Example
//!
//! ```
//! use ssh_askpass_core::{
//!     Intent, MemoryCredentialStore, MemoryPreferenceStore, PromptRequest, PromptSession,
//!     PromptVariant,
//! };
//!
//! let request = PromptRequest::new(PromptVariant::Passphrase)
//!     .with_account("/home/alice/.ssh/id_ed25519");
//! let mut session = PromptSession::new(
//!     request,
//!     MemoryCredentialStore::new(),
//!     MemoryPreferenceStore::new(),
//!     false,
//! );
//!
//! session.apply(Intent::UpdateSecret("hunter2".to_string().into()));
//! session.apply(Intent::Accept);
//! assert_eq!(session.state().exit_code(), Some(0));
//! ```

pub mod config;
pub mod countdown;
pub mod detect;
pub mod memory;
pub mod preferences;
pub mod session;
pub mod traits;
pub mod types;

// Re-export commonly used types at the crate root for convenience
pub use config::{Config, ConfigError, Frontend};
pub use countdown::{CancelToken, CountdownTimer, Tick};
pub use detect::{detect_prompt, parse_timeout, Detection};
pub use memory::{MemoryCredentialStore, MemoryPreferenceStore};
pub use preferences::FilePreferenceStore;
pub use session::{
    replace_question, Effect, Intent, PromptSession, ReplaceChoice, SessionState, SessionView,
    REMEMBER_PREFERENCE_KEY, REPLACE_TITLE, STORE_ERROR_TITLE,
};
pub use traits::{
    CredentialStore, PreferenceError, PreferenceStore, Presenter, PromptError, StoreError,
    StoreOutcome,
};
pub use types::{Control, Outcome, PromptRequest, PromptVariant};
