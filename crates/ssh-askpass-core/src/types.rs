//! Core types for ssh-askpass.
//!
//! This module contains the value types shared by the session, the
//! presentation adapters and the host binary: the prompt variant, the
//! immutable prompt request, the dialog controls and the terminal outcome.

use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// The kind of prompt the calling process asked for.
///
/// The variant decides which affordances the dialog shows and which
/// behaviors (countdown, credential store) are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    /// Yes/no question (e.g. "Allow use of key?").
    Confirmation,
    /// Notice with a single dismiss control.
    Information,
    /// Remote or PIN password.
    Password,
    /// Key passphrase.
    Passphrase,
    /// Key passphrase after a failed attempt.
    BadPassphrase,
    /// Free-form answer that is not a secret worth storing (e.g. "yes").
    InputConfirmation,
}

impl PromptVariant {
    /// Returns whether the dialog shows a secret input field.
    pub fn has_secret_field(&self) -> bool {
        matches!(
            self,
            PromptVariant::Password
                | PromptVariant::Passphrase
                | PromptVariant::BadPassphrase
                | PromptVariant::InputConfirmation
        )
    }

    /// Returns whether the entered secret may be kept in the credential store.
    pub fn can_remember(&self) -> bool {
        matches!(
            self,
            PromptVariant::Password | PromptVariant::Passphrase | PromptVariant::BadPassphrase
        )
    }

    /// Returns whether a countdown may auto-dismiss this prompt.
    pub fn supports_countdown(&self) -> bool {
        matches!(self, PromptVariant::Confirmation)
    }

    /// Returns whether the dialog has an accept (OK) control.
    pub fn has_accept_control(&self) -> bool {
        !matches!(self, PromptVariant::Information)
    }

    /// Text shown when the calling process supplied no message.
    pub fn default_message(&self) -> &'static str {
        match self {
            PromptVariant::Confirmation => "Do you want to proceed?",
            PromptVariant::Information => "",
            PromptVariant::Password => "Enter your password:",
            PromptVariant::Passphrase => "Enter your passphrase:",
            PromptVariant::BadPassphrase => "Bad passphrase, try again:",
            PromptVariant::InputConfirmation => "Please confirm:",
        }
    }
}

impl std::fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptVariant::Confirmation => write!(f, "confirmation"),
            PromptVariant::Information => write!(f, "information"),
            PromptVariant::Password => write!(f, "password"),
            PromptVariant::Passphrase => write!(f, "passphrase"),
            PromptVariant::BadPassphrase => write!(f, "bad_passphrase"),
            PromptVariant::InputConfirmation => write!(f, "input_confirmation"),
        }
    }
}

impl FromStr for PromptVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "confirmation" => Ok(PromptVariant::Confirmation),
            "information" => Ok(PromptVariant::Information),
            "password" => Ok(PromptVariant::Password),
            "passphrase" => Ok(PromptVariant::Passphrase),
            "bad_passphrase" => Ok(PromptVariant::BadPassphrase),
            "input_confirmation" => Ok(PromptVariant::InputConfirmation),
            other => Err(format!("unknown prompt variant: {}", other)),
        }
    }
}

/// What to ask the user.
///
/// Built once by the host from its arguments and environment, then handed to
/// the session. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// The prompt variant.
    pub variant: PromptVariant,
    /// Message from the calling process (empty means default copy).
    pub message: String,
    /// Credential store account for the secret (may be empty).
    pub account: String,
    /// Countdown for confirmation prompts, zero for none.
    pub timeout_secs: u64,
}

impl PromptRequest {
    /// Create a request with an empty message, no account and no countdown.
    pub fn new(variant: PromptVariant) -> Self {
        Self {
            variant,
            message: String::new(),
            account: String::new(),
            timeout_secs: 0,
        }
    }

    /// Set the message text.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the credential store account.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// Set the countdown in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Returns whether the secret can be stored for this request.
    pub fn remember_eligible(&self) -> bool {
        self.variant.can_remember() && !self.account.is_empty()
    }

    /// Returns whether this request arms a countdown.
    pub fn countdown_armed(&self) -> bool {
        self.variant.supports_countdown() && self.timeout_secs > 0
    }

    /// The message to display, falling back to the variant's default copy.
    pub fn display_message(&self) -> &str {
        if self.message.is_empty() {
            self.variant.default_message()
        } else {
            &self.message
        }
    }
}

/// The two buttons of the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Cancel, or Close for information prompts.
    Cancel,
    /// OK / accept.
    Ok,
}

impl Control {
    /// The other control.
    pub fn toggled(self) -> Self {
        match self {
            Control::Cancel => Control::Ok,
            Control::Ok => Control::Cancel,
        }
    }
}

/// Terminal result of a prompt session.
#[derive(Clone)]
pub enum Outcome {
    /// The user accepted; the secret goes to stdout.
    Accepted(SecretString),
    /// The user cancelled, dismissed, or the countdown expired.
    Cancelled,
}

impl Outcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Accepted(_) => 0,
            Outcome::Cancelled => 1,
        }
    }

    /// The secret to print, if any.
    pub fn secret(&self) -> Option<&SecretString> {
        match self {
            Outcome::Accepted(secret) => Some(secret),
            Outcome::Cancelled => None,
        }
    }

    /// Returns whether the user accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }
}

// Manual Debug implementation to avoid exposing the secret
impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Accepted(_) => f.debug_tuple("Accepted").field(&"[REDACTED]").finish(),
            Outcome::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const ALL: [PromptVariant; 6] = [
        PromptVariant::Confirmation,
        PromptVariant::Information,
        PromptVariant::Password,
        PromptVariant::Passphrase,
        PromptVariant::BadPassphrase,
        PromptVariant::InputConfirmation,
    ];

    #[test]
    fn variant_display_parses_back() {
        for variant in ALL {
            let parsed: PromptVariant = variant.to_string().parse().unwrap();
            assert_eq!(parsed, variant);
        }
        assert_eq!(
            "bad-passphrase".parse::<PromptVariant>(),
            Ok(PromptVariant::BadPassphrase)
        );
        assert!("nope".parse::<PromptVariant>().is_err());
    }

    #[test]
    fn variant_serde_uses_snake_case() {
        let json = serde_json::to_string(&PromptVariant::InputConfirmation).unwrap();
        assert_eq!(json, "\"input_confirmation\"");
    }

    #[test]
    fn only_secret_variants_can_remember() {
        let remember: Vec<_> = ALL.into_iter().filter(|v| v.can_remember()).collect();
        assert_eq!(
            remember,
            vec![
                PromptVariant::Password,
                PromptVariant::Passphrase,
                PromptVariant::BadPassphrase
            ]
        );
        assert!(PromptVariant::InputConfirmation.has_secret_field());
        assert!(!PromptVariant::Confirmation.has_secret_field());
        assert!(!PromptVariant::Information.has_accept_control());
    }

    #[test]
    fn countdown_only_for_confirmation() {
        for variant in ALL {
            let request = PromptRequest::new(variant).with_timeout(10);
            assert_eq!(
                request.countdown_armed(),
                variant == PromptVariant::Confirmation
            );
        }
        assert!(!PromptRequest::new(PromptVariant::Confirmation).countdown_armed());
    }

    #[test]
    fn remember_requires_account() {
        let request = PromptRequest::new(PromptVariant::Passphrase);
        assert!(!request.remember_eligible());
        assert!(request.with_account("/home/u/.ssh/id_ed25519").remember_eligible());
        assert!(!PromptRequest::new(PromptVariant::InputConfirmation)
            .with_account("x")
            .remember_eligible());
    }

    #[test]
    fn display_message_falls_back_to_default() {
        let request = PromptRequest::new(PromptVariant::Password);
        assert_eq!(request.display_message(), "Enter your password:");
        let request = request.with_message("alice@host's password:");
        assert_eq!(request.display_message(), "alice@host's password:");
    }

    #[test]
    fn outcome_exit_codes() {
        let accepted = Outcome::Accepted(SecretString::from("pw"));
        assert_eq!(accepted.exit_code(), 0);
        assert_eq!(accepted.secret().unwrap().expose_secret(), "pw");
        assert_eq!(Outcome::Cancelled.exit_code(), 1);
        assert!(Outcome::Cancelled.secret().is_none());
    }

    #[test]
    fn outcome_debug_redacts_secret() {
        let accepted = Outcome::Accepted(SecretString::from("super-secret"));
        let debug_output = format!("{:?}", accepted);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn control_toggles() {
        assert_eq!(Control::Cancel.toggled(), Control::Ok);
        assert_eq!(Control::Ok.toggled(), Control::Cancel);
    }
}
