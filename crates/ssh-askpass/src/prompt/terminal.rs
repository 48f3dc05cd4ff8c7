//! Terminal dialog for headless systems.
//!
//! The dialog talks to the controlling terminal (`/dev/tty`), never to
//! stdin/stdout: stdout is reserved for the secret. Secrets are read with
//! `rpassword` so they are not echoed.
//!
//! Reading the terminal blocks, so the dialog runs on its own thread. It
//! sends [`Intent`]s to the runner and waits for [`Notice`]s telling it how
//! the session reacted (re-render, replace question, error, close).

use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::mpsc::{self as std_mpsc, Receiver, Sender};
use std::thread;

use secrecy::SecretString;
use ssh_askpass_core::{
    replace_question, Control, Intent, Presenter, PromptError, PromptVariant, ReplaceChoice,
    SessionView, REPLACE_TITLE,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

const TTY_PATH: &str = "/dev/tty";

/// Session reactions forwarded to the dialog thread.
#[derive(Debug)]
enum Notice {
    Render(SessionView),
    Replace(String),
    Error { title: String, message: String },
    Close,
}

/// Where secrets are read from.
enum SecretSource {
    /// `rpassword` on the controlling terminal, without echo.
    Tty,
    /// A plain line from the dialog's reader.
    #[cfg_attr(not(test), allow(dead_code))]
    Reader,
}

/// Terminal-based dialog.
pub struct TerminalPresenter {
    notices: Option<Sender<Notice>>,
    last_forwarded: Option<SessionView>,
}

impl TerminalPresenter {
    /// Create a new terminal presenter. The terminal is opened in `open`.
    pub fn new() -> Self {
        Self {
            notices: None,
            last_forwarded: None,
        }
    }

    /// Returns whether a controlling terminal can be opened.
    pub fn is_available() -> bool {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(TTY_PATH)
            .is_ok()
    }

    fn notify(&mut self, notice: Notice) {
        if let Some(notices) = &self.notices {
            if notices.send(notice).is_err() {
                debug!("Terminal dialog thread is gone");
                self.notices = None;
            }
        }
    }
}

impl Default for TerminalPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for TerminalPresenter {
    fn open(
        &mut self,
        view: &SessionView,
        events: UnboundedSender<Intent>,
    ) -> Result<(), PromptError> {
        let tty = OpenOptions::new()
            .read(true)
            .write(true)
            .open(TTY_PATH)
            .map_err(|e| {
                PromptError::InitializationFailed(format!("cannot open {}: {}", TTY_PATH, e))
            })?;
        let reader = tty
            .try_clone()
            .map_err(|e| PromptError::InitializationFailed(format!("cannot clone tty: {}", e)))?;

        let (notices_tx, notices) = std_mpsc::channel();
        let dialog = TerminalDialog {
            reader: BufReader::new(reader),
            writer: tty,
            secrets: SecretSource::Tty,
            events,
            notices,
            view: view.clone(),
        };

        thread::Builder::new()
            .name("ssh-askpass-tty".to_string())
            .spawn(move || dialog.run())
            .map_err(|e| {
                PromptError::InitializationFailed(format!("cannot start tty thread: {}", e))
            })?;

        self.notices = Some(notices_tx);
        self.last_forwarded = Some(view.clone());
        debug!("Terminal dialog started");
        Ok(())
    }

    fn render(&mut self, view: &SessionView) {
        // A blocked line read cannot be redrawn; countdown ticks are skipped.
        if let Some(last) = &self.last_forwarded {
            if countdown_only_change(last, view) {
                trace!(remaining = ?view.remaining_secs, "Countdown tick not forwarded");
                return;
            }
        }
        self.last_forwarded = Some(view.clone());
        self.notify(Notice::Render(view.clone()));
    }

    fn confirm_replace(&mut self, account: &str) {
        self.notify(Notice::Replace(account.to_string()));
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.notify(Notice::Error {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn close(&mut self) {
        self.notify(Notice::Close);
        self.notices = None;
    }
}

/// Returns whether `next` differs from `last` only by a running countdown.
fn countdown_only_change(last: &SessionView, next: &SessionView) -> bool {
    let strip = |view: &SessionView| SessionView {
        remaining_secs: None,
        cancel_label: String::new(),
        ..view.clone()
    };
    next.remaining_secs.is_some() && strip(last) == strip(next)
}

/// Interpret one line typed at a confirmation prompt.
fn parse_confirmation(line: &str) -> Option<Intent> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.contains('\t') || matches!(line.trim(), ">" | "<") {
        return Some(Intent::AdvanceFocus);
    }
    match line.trim().to_ascii_lowercase().as_str() {
        "" => Some(Intent::ActivateDefault),
        "y" | "yes" | "ok" => Some(Intent::Accept),
        "n" | "no" | "cancel" => Some(Intent::Cancel),
        _ => None,
    }
}

fn parse_yes_no(line: &str, default: bool) -> bool {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

fn parse_replace(line: &str) -> ReplaceChoice {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "replace" => ReplaceChoice::Replace,
        _ => ReplaceChoice::KeepEditing,
    }
}

fn confirmation_hint(view: &SessionView) -> String {
    let default = match view.default_control {
        Control::Ok => "OK",
        Control::Cancel => view.cancel_label.as_str(),
    };
    format!("[y/n, Tab to switch, Return = {}]", default)
}

fn secret_label(variant: PromptVariant) -> &'static str {
    match variant {
        PromptVariant::Password => "Password: ",
        PromptVariant::InputConfirmation => "Answer: ",
        _ => "Passphrase: ",
    }
}

/// The blocking half of the terminal presenter.
struct TerminalDialog<R, W> {
    reader: R,
    writer: W,
    secrets: SecretSource,
    events: UnboundedSender<Intent>,
    notices: Receiver<Notice>,
    view: SessionView,
}

impl<R: BufRead, W: Write> TerminalDialog<R, W> {
    fn run(mut self) {
        match self.interact() {
            Ok(()) => debug!("Terminal dialog finished"),
            Err(e) => {
                warn!(error = %e, "Terminal dialog failed, cancelling");
                let _ = self.events.send(Intent::Cancel);
            }
        }
    }

    fn interact(&mut self) -> io::Result<()> {
        writeln!(self.writer, "{}", self.view.message)?;

        loop {
            let Some(intent) = self.next_intent()? else {
                return Ok(());
            };

            let mut notice = self.exchange(intent);
            loop {
                match notice {
                    None | Some(Notice::Close) => return Ok(()),
                    Some(Notice::Render(view)) => {
                        self.view = view;
                        break;
                    }
                    Some(Notice::Error { title, message }) => {
                        writeln!(self.writer, "{}: {}", title, message)?;
                        break;
                    }
                    Some(Notice::Replace(account)) => {
                        let choice = self.ask_replace(&account)?;
                        notice = self.exchange(Intent::ResolveDuplicate(choice));
                    }
                }
            }
        }
    }

    /// Send `intent` and wait for the session's reaction.
    fn exchange(&mut self, intent: Intent) -> Option<Notice> {
        // Anything queued while the user was typing is stale.
        while let Ok(notice) = self.notices.try_recv() {
            if matches!(notice, Notice::Close) {
                return Some(Notice::Close);
            }
        }
        self.events.send(intent).ok()?;
        self.notices.recv().ok()
    }

    fn next_intent(&mut self) -> io::Result<Option<Intent>> {
        match self.view.variant {
            PromptVariant::Information => {
                self.prompt(&format!("[Return = {}]", self.view.cancel_label))?;
                self.read_line()?;
                Ok(Some(Intent::ActivateDefault))
            }
            PromptVariant::Confirmation => loop {
                let hint = confirmation_hint(&self.view);
                self.prompt(&hint)?;
                let Some(line) = self.read_line()? else {
                    return Ok(Some(Intent::Cancel));
                };
                if let Some(intent) = parse_confirmation(&line) {
                    return Ok(Some(intent));
                }
            },
            _ => self.read_secret(),
        }
    }

    fn read_secret(&mut self) -> io::Result<Option<Intent>> {
        let label = secret_label(self.view.variant);
        let secret = match self.secrets {
            SecretSource::Tty => rpassword::prompt_password(label).map(Some)?,
            SecretSource::Reader => {
                self.prompt(label.trim_end())?;
                self.read_line()?
            }
        };
        let Some(secret) = secret else {
            return Ok(Some(Intent::Cancel));
        };

        if self
            .events
            .send(Intent::UpdateSecret(SecretString::from(secret)))
            .is_err()
        {
            return Ok(None);
        }

        if self.view.remember_visible && self.view.remember_enabled {
            if self.view.entry_exists {
                writeln!(self.writer, "A secret for this key is already stored. Remembering asks before replacing it.")?;
            }
            let current = self.view.remember_checked;
            self.prompt(if current {
                "Remember in keychain? [Y/n]"
            } else {
                "Remember in keychain? [y/N]"
            })?;
            let wanted = self
                .read_line()?
                .map_or(current, |line| parse_yes_no(&line, current));

            if wanted != current {
                match self.exchange(Intent::ToggleRemember(wanted)) {
                    Some(Notice::Render(view)) => self.view = view,
                    None | Some(Notice::Close) => return Ok(None),
                    Some(other) => trace!(notice = ?other, "Unexpected notice after toggle"),
                }
            }
        }

        Ok(Some(Intent::Accept))
    }

    fn ask_replace(&mut self, account: &str) -> io::Result<ReplaceChoice> {
        writeln!(self.writer, "{}: {}", REPLACE_TITLE, replace_question(account))?;
        self.prompt("[r]eplace / [c]ancel:")?;
        let line = self.read_line()?.unwrap_or_default();
        Ok(parse_replace(&line))
    }

    fn prompt(&mut self, text: &str) -> io::Result<()> {
        write!(self.writer, "{} ", text)?;
        self.writer.flush()
    }

    /// One line without its terminator, `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
        Ok(Some(line))
    }
}
