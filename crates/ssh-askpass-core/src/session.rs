//! Prompt session state machine.
//!
//! A [`PromptSession`] owns the request, the optional countdown and the
//! injected stores. Presentation adapters never mutate dialog state directly;
//! they send [`Intent`]s and react to the returned [`Effect`]:
//!
//! ```text
//! Intent ──► PromptSession ──► Effect
//!              │    │            ├─ Render          redraw from view()
//!              │    │            ├─ ConfirmReplace  replace sub-dialog
//!              │    │            ├─ ShowError       modal alert
//!              │    │            └─ Exit(Outcome)   terminal
//!              │    └─ PreferenceStore
//!              └─ CredentialStore
//! ```
//!
//! Once an `Exit` effect has been returned every further intent yields
//! [`Effect::Unchanged`].

use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::countdown::{CancelToken, CountdownTimer, Tick};
use crate::traits::{CredentialStore, PreferenceStore, StoreOutcome};
use crate::types::{Control, Outcome, PromptRequest, PromptVariant};

/// Preference key for the default state of the remember control.
pub const REMEMBER_PREFERENCE_KEY: &str = "remember_in_store";

/// Title of the alert shown for credential store failures.
pub const STORE_ERROR_TITLE: &str = "Keychain Error";

/// Title of the replace question.
pub const REPLACE_TITLE: &str = "Warning";

/// Question shown when the account already has a stored secret.
pub fn replace_question(account: &str) -> String {
    format!(
        "A passphrase for \"{}\" already exists in the keychain.\nDo you want to replace it?",
        account
    )
}

/// The user's answer to the replace question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceChoice {
    /// Delete the stored entry and store the new secret.
    Replace,
    /// Keep the stored entry and return to the dialog.
    KeepEditing,
}

/// A user action, already translated from toolkit events.
#[derive(Clone)]
pub enum Intent {
    /// The content of the secret field changed.
    UpdateSecret(SecretString),
    /// The OK control was activated.
    Accept,
    /// The Cancel (or Close) control was activated.
    Cancel,
    /// The accept key (Return) was pressed.
    ActivateDefault,
    /// Tab, left or right arrow.
    AdvanceFocus,
    /// The remember control was toggled.
    ToggleRemember(bool),
    /// Answer to a [`Effect::ConfirmReplace`] question.
    ResolveDuplicate(ReplaceChoice),
}

// Manual Debug implementation to avoid exposing the secret
impl std::fmt::Debug for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::UpdateSecret(_) => f.debug_tuple("UpdateSecret").field(&"[REDACTED]").finish(),
            Intent::Accept => write!(f, "Accept"),
            Intent::Cancel => write!(f, "Cancel"),
            Intent::ActivateDefault => write!(f, "ActivateDefault"),
            Intent::AdvanceFocus => write!(f, "AdvanceFocus"),
            Intent::ToggleRemember(value) => f.debug_tuple("ToggleRemember").field(value).finish(),
            Intent::ResolveDuplicate(choice) => {
                f.debug_tuple("ResolveDuplicate").field(choice).finish()
            }
        }
    }
}

/// What the presentation layer has to do after an intent or tick.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Nothing visible changed.
    Unchanged,
    /// The view changed and should be redrawn.
    Render,
    /// Ask the user whether to replace the stored entry.
    ConfirmReplace { account: String },
    /// Show a modal error; the session stays active.
    ShowError { title: String, message: String },
    /// The session is over.
    Exit(Outcome),
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the user.
    Active,
    /// Finished with the given exit code.
    Terminated { exit_code: u8 },
}

impl SessionState {
    /// The exit code, once terminated.
    pub fn exit_code(self) -> Option<u8> {
        match self {
            SessionState::Active => None,
            SessionState::Terminated { exit_code } => Some(exit_code),
        }
    }
}

/// Snapshot of everything a presenter needs to draw the dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub variant: PromptVariant,
    pub message: String,
    pub account: String,
    pub secret_field_visible: bool,
    pub remember_visible: bool,
    pub remember_enabled: bool,
    pub remember_checked: bool,
    /// An entry for the account was already in the store at start.
    pub entry_exists: bool,
    pub accept_visible: bool,
    pub cancel_label: String,
    pub focused: Control,
    /// The control triggered by the accept key.
    pub default_control: Control,
    /// Seconds left while a countdown is running.
    pub remaining_secs: Option<u64>,
    pub replace_pending: bool,
}

/// The prompt state machine.
pub struct PromptSession<S, P> {
    request: PromptRequest,
    store: S,
    preferences: P,
    countdown: Option<CountdownTimer>,
    remember: bool,
    focused: Control,
    secret: SecretString,
    entry_exists: bool,
    replace_pending: bool,
    state: SessionState,
}

impl<S: CredentialStore, P: PreferenceStore> PromptSession<S, P> {
    /// Start a session.
    ///
    /// `default_remember` is used when no preference has been persisted yet.
    pub fn new(request: PromptRequest, store: S, preferences: P, default_remember: bool) -> Self {
        let countdown = request
            .countdown_armed()
            .then(|| CountdownTimer::new(request.timeout_secs));

        let focused = match request.variant {
            PromptVariant::Confirmation | PromptVariant::Information => Control::Cancel,
            _ => Control::Ok,
        };

        let mut remember = preferences
            .get_bool(REMEMBER_PREFERENCE_KEY)
            .unwrap_or(default_remember);
        let mut entry_exists = false;

        if request.remember_eligible() {
            entry_exists = store.query(&request.account);
            if entry_exists {
                debug!(account = %request.account, "Entry already stored");
            }
        } else {
            remember = false;
        }

        debug!(
            variant = %request.variant,
            countdown = ?countdown.as_ref().map(CountdownTimer::remaining),
            remember,
            "Prompt session started"
        );

        Self {
            request,
            store,
            preferences,
            countdown,
            remember,
            focused,
            secret: SecretString::from(String::new()),
            entry_exists,
            replace_pending: false,
            state: SessionState::Active,
        }
    }

    /// The request this session answers.
    pub fn request(&self) -> &PromptRequest {
        &self.request
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns whether the session still accepts intents.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Current value of the remember control.
    pub fn remember_in_store(&self) -> bool {
        self.remember
    }

    /// Returns whether the remember control can be changed.
    pub fn remember_enabled(&self) -> bool {
        self.request.remember_eligible()
    }

    /// The focused button.
    pub fn focused_control(&self) -> Control {
        self.focused
    }

    /// The control triggered by the accept key; follows focus.
    pub fn accept_key_binding(&self) -> Control {
        self.focused
    }

    /// Returns whether a replace question is waiting for an answer.
    pub fn is_replace_pending(&self) -> bool {
        self.replace_pending
    }

    /// Seconds left, while the countdown is running.
    pub fn remaining_secs(&self) -> Option<u64> {
        self.countdown
            .as_ref()
            .filter(|c| c.is_running())
            .map(CountdownTimer::remaining)
    }

    /// Returns whether a countdown is running.
    pub fn countdown_running(&self) -> bool {
        self.countdown.as_ref().is_some_and(CountdownTimer::is_running)
    }

    /// Cancellation handle for the ticker, if a countdown was armed.
    pub fn countdown_token(&self) -> Option<CancelToken> {
        self.countdown.as_ref().map(CountdownTimer::token)
    }

    /// Label of the Cancel control.
    pub fn cancel_label(&self) -> String {
        if self.request.variant == PromptVariant::Information {
            return "Close".to_string();
        }
        match self.remaining_secs() {
            Some(secs) => format!("Cancel (in {}s)", secs),
            None => "Cancel".to_string(),
        }
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> SessionView {
        let variant = self.request.variant;
        SessionView {
            variant,
            message: self.request.display_message().to_string(),
            account: self.request.account.clone(),
            secret_field_visible: variant.has_secret_field(),
            remember_visible: variant.can_remember(),
            remember_enabled: self.remember_enabled(),
            remember_checked: self.remember,
            entry_exists: self.entry_exists,
            accept_visible: variant.has_accept_control(),
            cancel_label: self.cancel_label(),
            focused: self.focused,
            default_control: self.accept_key_binding(),
            remaining_secs: self.remaining_secs(),
            replace_pending: self.replace_pending,
        }
    }

    /// Dispatch an intent to its handler.
    pub fn apply(&mut self, intent: Intent) -> Effect {
        debug!(intent = ?intent, "Applying intent");
        match intent {
            Intent::UpdateSecret(secret) => self.update_secret(secret),
            Intent::Accept => self.accept(),
            Intent::Cancel => self.cancel(),
            Intent::ActivateDefault => self.activate_default(),
            Intent::AdvanceFocus => self.advance_focus(),
            Intent::ToggleRemember(value) => self.toggle_remember(value),
            Intent::ResolveDuplicate(choice) => self.resolve_duplicate(choice),
        }
    }

    /// Replace the entered secret.
    pub fn update_secret(&mut self, secret: SecretString) -> Effect {
        if self.is_active() {
            self.secret = secret;
        }
        Effect::Unchanged
    }

    /// Move focus between Cancel and OK (confirmation prompts only).
    ///
    /// Any running countdown stops for good.
    pub fn advance_focus(&mut self) -> Effect {
        if !self.is_active() || self.request.variant != PromptVariant::Confirmation {
            return Effect::Unchanged;
        }

        if let Some(countdown) = self.countdown.as_ref().filter(|c| c.is_running()) {
            countdown.cancel();
            debug!("Focus changed, countdown stopped");
        }

        self.focused = self.focused.toggled();
        Effect::Render
    }

    /// Trigger whichever control the accept key is bound to.
    pub fn activate_default(&mut self) -> Effect {
        match self.accept_key_binding() {
            Control::Ok => self.accept(),
            Control::Cancel => self.cancel(),
        }
    }

    /// Dismiss the prompt.
    pub fn cancel(&mut self) -> Effect {
        if !self.is_active() {
            return Effect::Unchanged;
        }
        info!(variant = %self.request.variant, "Prompt cancelled");
        self.terminate(Outcome::Cancelled)
    }

    /// Accept the prompt, storing the secret first when asked to.
    pub fn accept(&mut self) -> Effect {
        if !self.is_active() || self.replace_pending {
            return Effect::Unchanged;
        }

        if self.remember && self.request.remember_eligible() {
            let account = &self.request.account;
            match self.store.add(account, &self.secret) {
                StoreOutcome::Success => {
                    info!(account = %account, "Secret stored");
                }
                StoreOutcome::DuplicateEntry => {
                    debug!(account = %account, "Entry exists, asking before replacing");
                    self.replace_pending = true;
                    return Effect::ConfirmReplace {
                        account: account.clone(),
                    };
                }
                StoreOutcome::Error(error) => {
                    warn!(account = %account, code = error.code, error = %error, "Failed to store secret");
                    return Effect::ShowError {
                        title: STORE_ERROR_TITLE.to_string(),
                        message: error.message,
                    };
                }
            }
        }

        let secret = if self.request.variant.has_secret_field() {
            self.secret.clone()
        } else {
            SecretString::from(String::new())
        };
        info!(variant = %self.request.variant, "Prompt accepted");
        self.terminate(Outcome::Accepted(secret))
    }

    /// Answer the replace question raised by [`Effect::ConfirmReplace`].
    pub fn resolve_duplicate(&mut self, choice: ReplaceChoice) -> Effect {
        if !self.is_active() || !self.replace_pending {
            return Effect::Unchanged;
        }
        self.replace_pending = false;

        match choice {
            ReplaceChoice::KeepEditing => Effect::Render,
            ReplaceChoice::Replace => match self.store.delete(&self.request.account) {
                Ok(()) => {
                    debug!(account = %self.request.account, "Old entry deleted, storing again");
                    self.accept()
                }
                Err(error) => {
                    warn!(
                        account = %self.request.account,
                        code = error.code,
                        error = %error,
                        "Failed to delete existing entry"
                    );
                    Effect::ShowError {
                        title: STORE_ERROR_TITLE.to_string(),
                        message: error.message,
                    }
                }
            },
        }
    }

    /// Set the remember control and persist it as the new default.
    pub fn toggle_remember(&mut self, value: bool) -> Effect {
        if !self.is_active() || !self.remember_enabled() {
            return Effect::Unchanged;
        }

        self.remember = value;
        if let Err(e) = self.preferences.set_bool(REMEMBER_PREFERENCE_KEY, value) {
            warn!(error = %e, "Failed to persist remember preference");
        }
        Effect::Render
    }

    /// Apply one countdown period.
    pub fn tick(&mut self) -> Effect {
        if !self.is_active() {
            return Effect::Unchanged;
        }
        let Some(countdown) = self.countdown.as_mut() else {
            return Effect::Unchanged;
        };

        match countdown.tick() {
            Tick::Remaining(_) => Effect::Render,
            Tick::Expired => {
                info!("Countdown expired");
                self.cancel()
            }
            Tick::Ignored => Effect::Unchanged,
        }
    }

    fn terminate(&mut self, outcome: Outcome) -> Effect {
        if let Some(countdown) = &self.countdown {
            countdown.cancel();
        }
        self.state = SessionState::Terminated {
            exit_code: outcome.exit_code(),
        };
        Effect::Exit(outcome)
    }
}
