//! Scripted presenter for testing.
//!
//! This module provides a [`Presenter`] that plays back a fixed list of
//! intents instead of waiting for a human, and records everything the
//! runner asks it to show. No display server or terminal is needed.

use std::time::Duration;

use ssh_askpass_core::{Intent, Presenter, PromptError, ReplaceChoice, SessionView};
use tokio::sync::mpsc::UnboundedSender;

/// A scripted presenter for tests.
///
/// # Example
///
/// ```
/// use secrecy::SecretString;
/// use ssh_askpass::prompt::MockPresenter;
/// use ssh_askpass_core::{Intent, ReplaceChoice};
///
/// // Type a passphrase, press Return, and agree to replace a stored one.
/// let presenter = MockPresenter::new()
///     .with_script([
///         Intent::UpdateSecret(SecretString::from("hunter2")),
///         Intent::ActivateDefault,
///     ])
///     .answer_replace(ReplaceChoice::Replace);
/// ```
#[derive(Default)]
pub struct MockPresenter {
    script: Vec<Intent>,
    delayed: Option<(Duration, Vec<Intent>)>,
    replace_answer: Option<ReplaceChoice>,
    after_replace: Vec<Intent>,
    after_error: Vec<Intent>,
    open_error: Option<PromptError>,
    hang_up: bool,
    events: Option<UnboundedSender<Intent>>,

    open_count: usize,
    views: Vec<SessionView>,
    replace_prompts: Vec<String>,
    errors: Vec<(String, String)>,
    closed: bool,
}

impl MockPresenter {
    /// Create a presenter that does nothing until the session ends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intents sent as soon as the dialog opens.
    pub fn with_script(mut self, intents: impl IntoIterator<Item = Intent>) -> Self {
        self.script.extend(intents);
        self
    }

    /// Intents sent `delay` after the dialog opens.
    pub fn with_delayed(mut self, delay: Duration, intents: impl IntoIterator<Item = Intent>) -> Self {
        self.delayed = Some((delay, intents.into_iter().collect()));
        self
    }

    /// Answer every replace question with `choice`.
    pub fn answer_replace(mut self, choice: ReplaceChoice) -> Self {
        self.replace_answer = Some(choice);
        self
    }

    /// Intents sent once, right after the first replace answer.
    pub fn after_replace(mut self, intents: impl IntoIterator<Item = Intent>) -> Self {
        self.after_replace.extend(intents);
        self
    }

    /// Intents sent once, after the first error is shown.
    pub fn after_error(mut self, intents: impl IntoIterator<Item = Intent>) -> Self {
        self.after_error.extend(intents);
        self
    }

    /// Make `open` fail with `error`.
    pub fn fail_open(mut self, error: PromptError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Drop the intent channel right after the script is sent.
    pub fn hang_up(mut self) -> Self {
        self.hang_up = true;
        self
    }

    /// Number of times `open` was called.
    pub fn open_count(&self) -> usize {
        self.open_count
    }

    /// The view passed to `open` followed by every rendered view.
    pub fn views(&self) -> Vec<SessionView> {
        self.views.clone()
    }

    /// Accounts the replace question was asked for.
    pub fn replace_prompts(&self) -> Vec<String> {
        self.replace_prompts.clone()
    }

    /// `(title, message)` of every error shown.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.clone()
    }

    /// Returns whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn send_all(&self, intents: Vec<Intent>) {
        if let Some(events) = &self.events {
            for intent in intents {
                let _ = events.send(intent);
            }
        }
    }
}

impl Presenter for MockPresenter {
    fn open(
        &mut self,
        view: &SessionView,
        events: UnboundedSender<Intent>,
    ) -> Result<(), PromptError> {
        self.open_count += 1;
        if let Some(error) = self.open_error.take() {
            return Err(error);
        }
        self.views.push(view.clone());

        if let Some((delay, intents)) = self.delayed.take() {
            let events = events.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                for intent in intents {
                    let _ = events.send(intent);
                }
            });
        }

        self.events = Some(events);
        let script = std::mem::take(&mut self.script);
        self.send_all(script);

        if self.hang_up {
            self.events = None;
        }
        Ok(())
    }

    fn render(&mut self, view: &SessionView) {
        self.views.push(view.clone());
    }

    fn confirm_replace(&mut self, account: &str) {
        self.replace_prompts.push(account.to_string());
        if let Some(choice) = self.replace_answer {
            self.send_all(vec![Intent::ResolveDuplicate(choice)]);
            let follow_up = std::mem::take(&mut self.after_replace);
            self.send_all(follow_up);
        }
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.errors.push((title.to_string(), message.to_string()));
        let follow_up = std::mem::take(&mut self.after_error);
        self.send_all(follow_up);
    }

    fn close(&mut self) {
        self.closed = true;
        self.events = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssh_askpass_core::{Control, PromptRequest, PromptVariant};
    use tokio::sync::mpsc;

    fn view() -> SessionView {
        SessionView {
            variant: PromptVariant::Password,
            message: PromptRequest::new(PromptVariant::Password)
                .display_message()
                .to_string(),
            account: String::new(),
            secret_field_visible: true,
            remember_visible: true,
            remember_enabled: false,
            remember_checked: false,
            entry_exists: false,
            accept_visible: true,
            cancel_label: "Cancel".to_string(),
            focused: Control::Ok,
            default_control: Control::Ok,
            remaining_secs: None,
            replace_pending: false,
        }
    }

    #[tokio::test]
    async fn sends_script_on_open() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut mock = MockPresenter::new().with_script([Intent::Accept, Intent::Cancel]);

        mock.open(&view(), tx).unwrap();

        assert!(matches!(rx.recv().await, Some(Intent::Accept)));
        assert!(matches!(rx.recv().await, Some(Intent::Cancel)));
        assert_eq!(mock.open_count(), 1);
        assert_eq!(mock.views().len(), 1);
    }

    #[tokio::test]
    async fn answers_replace_then_follow_up() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut mock = MockPresenter::new()
            .answer_replace(ReplaceChoice::KeepEditing)
            .after_replace([Intent::Cancel]);
        mock.open(&view(), tx).unwrap();

        mock.confirm_replace("key");
        mock.confirm_replace("key");

        assert!(matches!(
            rx.recv().await,
            Some(Intent::ResolveDuplicate(ReplaceChoice::KeepEditing))
        ));
        assert!(matches!(rx.recv().await, Some(Intent::Cancel)));
        assert!(matches!(
            rx.recv().await,
            Some(Intent::ResolveDuplicate(ReplaceChoice::KeepEditing))
        ));
        assert_eq!(mock.replace_prompts(), ["key", "key"]);
    }

    #[tokio::test]
    async fn hang_up_closes_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut mock = MockPresenter::new().with_script([Intent::AdvanceFocus]).hang_up();
        mock.open(&view(), tx).unwrap();

        assert!(matches!(rx.recv().await, Some(Intent::AdvanceFocus)));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn open_error_is_returned_once() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut mock = MockPresenter::new().fail_open(PromptError::UiError("boom".into()));

        assert!(mock.open(&view(), tx.clone()).is_err());
        assert!(mock.open(&view(), tx).is_ok());
        assert_eq!(mock.open_count(), 2);
    }

    #[test]
    fn records_errors_and_close() {
        let mut mock = MockPresenter::new();
        mock.show_error("Keychain Error", "locked");
        mock.close();

        assert_eq!(
            mock.errors(),
            [("Keychain Error".to_string(), "locked".to_string())]
        );
        assert!(mock.is_closed());
    }
}
