//! Dialog implementations.
//!
//! This module provides implementations of the [`Presenter`] trait:
//!
//! - [`Gtk4Presenter`]: GTK4 dialog (feature `gtk`)
//! - [`TerminalPresenter`]: controlling-terminal dialog for headless systems
//! - [`MockPresenter`]: scripted presenter for testing
//!
//! [`Presenter`]: ssh_askpass_core::Presenter

#[cfg(feature = "gtk")]
mod gtk4_prompt;
mod mock;
mod terminal;

#[cfg(feature = "gtk")]
pub use gtk4_prompt::Gtk4Presenter;
pub use mock::MockPresenter;
pub use terminal::TerminalPresenter;
