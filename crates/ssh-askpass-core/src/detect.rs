//! Prompt detection from the calling process's signals.
//!
//! OpenSSH tells the askpass program what it wants in two ways: the
//! `SSH_ASKPASS_PROMPT` environment variable (`confirm` for yes/no
//! questions, `none` for notices) and the prompt text itself. This module
//! turns both into a [`PromptVariant`] plus, for key passphrases, the key
//! path used as the credential store account.
//!
//! # Supported Prompt Formats
//!
//! ## Key passphrases
//! - `Enter passphrase for key '/home/user/.ssh/id_rsa':`
//! - `Enter passphrase for /home/user/.ssh/id_ed25519:`
//! - `Enter passphrase for /home/user/.ssh/id_ed25519 (will confirm each use):`
//! - `Bad passphrase, try again for /home/user/.ssh/id_ed25519:`
//!
//! ## Passwords and PINs
//! - `user@host's password:`
//! - `Enter PIN for ECDSA-SK key SHA256:...:`
//! - `Enter PIN for 'My Smart Card':`
//!
//! ## Questions
//! - `Are you sure you want to continue connecting (yes/no/[fingerprint])?`
//! - `Allow use of key /home/user/.ssh/id_ed25519?`

use crate::types::{PromptRequest, PromptVariant};

/// Value of `SSH_ASKPASS_PROMPT` asking for a yes/no confirmation.
pub const HINT_CONFIRM: &str = "confirm";

/// Value of `SSH_ASKPASS_PROMPT` asking for a notice without input.
pub const HINT_NONE: &str = "none";

/// Result of prompt detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// The detected prompt variant.
    pub variant: PromptVariant,
    /// The credential store account (key path), empty when unknown.
    pub account: String,
}

impl Detection {
    fn new(variant: PromptVariant, account: impl Into<String>) -> Self {
        Self {
            variant,
            account: account.into(),
        }
    }

    /// Build the request for this detection.
    pub fn into_request(self, message: impl Into<String>, timeout_secs: u64) -> PromptRequest {
        PromptRequest::new(self.variant)
            .with_message(message)
            .with_account(self.account)
            .with_timeout(timeout_secs)
    }
}

/// Detect the prompt variant and account.
///
/// # Arguments
///
/// * `message` - The prompt text passed as the first argument
/// * `hint` - The value of `SSH_ASKPASS_PROMPT`, if set
///
/// # Examples
///
/// ```
/// use ssh_askpass_core::detect::detect_prompt;
/// use ssh_askpass_core::types::PromptVariant;
///
/// let result = detect_prompt("Enter passphrase for key '/home/u/.ssh/id_rsa': ", None);
/// assert_eq!(result.variant, PromptVariant::Passphrase);
/// assert_eq!(result.account, "/home/u/.ssh/id_rsa");
///
/// let result = detect_prompt("Allow use of key /home/u/.ssh/id_rsa?", Some("confirm"));
/// assert_eq!(result.variant, PromptVariant::Confirmation);
/// assert!(result.account.is_empty());
/// ```
pub fn detect_prompt(message: &str, hint: Option<&str>) -> Detection {
    match hint.map(|h| h.trim().to_ascii_lowercase()).as_deref() {
        Some(HINT_CONFIRM) => return Detection::new(PromptVariant::Confirmation, ""),
        Some(HINT_NONE) => return Detection::new(PromptVariant::Information, ""),
        _ => {}
    }

    if let Some(result) = detect_passphrase(message) {
        return result;
    }

    if let Some(result) = detect_question(message) {
        return result;
    }

    Detection::new(PromptVariant::Password, "")
}

/// Parse `SSH_ASKPASS_TIMEOUT`.
///
/// Absent, negative or unparsable values mean no countdown.
pub fn parse_timeout(value: Option<&str>) -> u64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|secs| secs.max(0) as u64)
        .unwrap_or(0)
}

/// Detect key passphrase prompts.
fn detect_passphrase(message: &str) -> Option<Detection> {
    // ASCII lowercasing keeps byte offsets aligned with `message`.
    let lower = message.to_ascii_lowercase();

    let (variant, marker) = if lower.starts_with("bad passphrase") {
        (PromptVariant::BadPassphrase, "try again for ")
    } else if lower.contains("passphrase for ") {
        (PromptVariant::Passphrase, "passphrase for ")
    } else {
        return None;
    };

    let account = lower
        .find(marker)
        .map(|start| &message[start + marker.len()..])
        .and_then(extract_key_path)
        .unwrap_or_default();

    Some(Detection::new(variant, account))
}

/// Detect questions that expect a typed answer or a yes/no click.
fn detect_question(message: &str) -> Option<Detection> {
    let lower = message.to_lowercase();

    if lower.contains("(yes/no") {
        return Some(Detection::new(PromptVariant::InputConfirmation, ""));
    }

    if lower.trim_start().starts_with("allow use of key") || lower.trim_start().starts_with("confirm ")
    {
        return Some(Detection::new(PromptVariant::Confirmation, ""));
    }

    None
}

/// Extract the key path following a "for " marker.
///
/// Handles quoted paths (`key '/path'`), bare paths with a trailing colon,
/// and the `(will confirm each use)` suffix added by ssh-add -c.
fn extract_key_path(rest: &str) -> Option<String> {
    let rest = rest.trim();
    let rest = rest.strip_prefix("key ").unwrap_or(rest);

    if let Some(quoted) = rest.strip_prefix('\'') {
        let end = quoted.find('\'')?;
        let path = &quoted[..end];
        return (!path.is_empty()).then(|| path.to_string());
    }

    let path = match rest.find(" (") {
        Some(idx) => &rest[..idx],
        None => rest,
    };
    let path = path.trim_end().trim_end_matches(':').trim_end();

    (!path.is_empty()).then(|| path.to_string())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The detector should never panic on arbitrary input.
        #[test]
        fn detect_never_panics(prompt in ".*", hint in proptest::option::of(".*")) {
            let _ = detect_prompt(&prompt, hint.as_deref());
        }

        /// Only passphrase variants carry an account.
        #[test]
        fn account_only_for_passphrases(prompt in ".*") {
            let result = detect_prompt(&prompt, None);
            if !result.account.is_empty() {
                prop_assert!(matches!(
                    result.variant,
                    PromptVariant::Passphrase | PromptVariant::BadPassphrase
                ));
            }
        }

        /// Detection is deterministic for the same input.
        #[test]
        fn detection_is_deterministic(prompt in ".*") {
            prop_assert_eq!(detect_prompt(&prompt, None), detect_prompt(&prompt, None));
        }

        /// Any integer timeout parses, negatives clamp to zero.
        #[test]
        fn timeout_never_negative(secs in any::<i32>()) {
            let parsed = parse_timeout(Some(&secs.to_string()));
            prop_assert_eq!(parsed, secs.max(0) as u64);
        }
    }
}
