//! SSH_ASKPASS helper with credential store integration.
//!
//! This crate wires the UI-agnostic [`ssh_askpass_core`] session to the
//! outside world: the OS keychain, the event loop and the dialogs.

pub mod keychain;
pub mod prompt;
pub mod runner;

pub use keychain::{KeyringStore, DEFAULT_SERVICE};
pub use runner::{run_session, spawn_ticker};
