//! GTK4 dialog implementation.
//!
//! GTK objects must stay on the thread that initialized GTK, so the dialog
//! lives on its own thread running a glib main loop. The runner side
//! ([`Gtk4Presenter`]) only sends [`Command`]s over a channel that the GTK
//! thread polls; widget callbacks send [`Intent`]s straight back to the
//! runner.
//!
//! The dialog contains:
//!
//! - The prompt message
//! - A password entry with visibility toggle (secret variants)
//! - A "Remember in keychain" checkbox (password/passphrase variants)
//! - Cancel (or Close) and OK buttons

use std::rc::Rc;
use std::sync::mpsc::{self as std_mpsc, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use gtk4::gdk::Key;
use gtk4::prelude::*;
use gtk4::{gio, glib};
use secrecy::SecretString;
use ssh_askpass_core::{
    replace_question, Control, Intent, Presenter, PromptError, PromptVariant, ReplaceChoice,
    SessionView, REPLACE_TITLE,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Requests from the runner to the GTK thread.
enum Command {
    Open(SessionView, UnboundedSender<Intent>),
    Render(SessionView),
    ConfirmReplace(String),
    ShowError { title: String, message: String },
    Close,
}

/// GTK4-based dialog.
pub struct Gtk4Presenter {
    commands: Option<Sender<Command>>,
    thread: Option<JoinHandle<()>>,
}

impl Gtk4Presenter {
    /// Start the GTK thread and initialize GTK on it.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::InitializationFailed` if GTK cannot be
    /// initialized (typically: no display).
    pub fn spawn() -> Result<Self, PromptError> {
        let (commands_tx, commands) = std_mpsc::channel();
        let (ready_tx, ready) = std_mpsc::channel();

        let thread = thread::Builder::new()
            .name("ssh-askpass-gtk".to_string())
            .spawn(move || gtk_thread(commands, ready_tx))
            .map_err(|e| {
                PromptError::InitializationFailed(format!("cannot start GTK thread: {}", e))
            })?;

        match ready.recv() {
            Ok(Ok(())) => Ok(Self {
                commands: Some(commands_tx),
                thread: Some(thread),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PromptError::InitializationFailed(
                "GTK thread exited during startup".into(),
            )),
        }
    }

    /// Returns whether a display server looks reachable.
    pub fn display_available() -> bool {
        cfg!(any(target_os = "macos", target_os = "windows"))
            || std::env::var_os("WAYLAND_DISPLAY").is_some()
            || std::env::var_os("DISPLAY").is_some()
    }

    fn send(&mut self, command: Command) {
        if let Some(commands) = &self.commands {
            if commands.send(command).is_err() {
                warn!("GTK thread is gone");
                self.commands = None;
            }
        }
    }
}

impl Presenter for Gtk4Presenter {
    fn open(
        &mut self,
        view: &SessionView,
        events: UnboundedSender<Intent>,
    ) -> Result<(), PromptError> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| PromptError::UiError("GTK thread is gone".into()))?;
        commands
            .send(Command::Open(view.clone(), events))
            .map_err(|_| PromptError::UiError("GTK thread is gone".into()))
    }

    fn render(&mut self, view: &SessionView) {
        self.send(Command::Render(view.clone()));
    }

    fn confirm_replace(&mut self, account: &str) {
        self.send(Command::ConfirmReplace(account.to_string()));
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.send(Command::ShowError {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn close(&mut self) {
        self.send(Command::Close);
        self.commands = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("GTK thread panicked");
            }
        }
    }
}

impl Drop for Gtk4Presenter {
    fn drop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Close);
        }
    }
}

fn gtk_thread(commands: Receiver<Command>, ready: Sender<Result<(), PromptError>>) {
    if let Err(e) = gtk4::init() {
        let _ = ready.send(Err(PromptError::InitializationFailed(format!(
            "GTK init failed: {}",
            e
        ))));
        return;
    }
    debug!("GTK initialized");
    if ready.send(Ok(())).is_err() {
        return;
    }

    let (view, events) = match commands.recv() {
        Ok(Command::Open(view, events)) => (view, events),
        _ => return,
    };

    let dialog = Dialog::build(&view, events);
    dialog.render(&view);
    dialog.window.present();

    let main_loop = glib::MainLoop::new(None, false);
    let quit = main_loop.clone();
    glib::timeout_add_local(POLL_INTERVAL, move || {
        loop {
            match commands.try_recv() {
                Ok(Command::Render(view)) => dialog.render(&view),
                Ok(Command::ConfirmReplace(account)) => dialog.confirm_replace(&account),
                Ok(Command::ShowError { title, message }) => dialog.show_error(&title, &message),
                Ok(Command::Open(..)) => warn!("Dialog already open"),
                Ok(Command::Close) | Err(std_mpsc::TryRecvError::Disconnected) => {
                    dialog.window.destroy();
                    quit.quit();
                    return glib::ControlFlow::Break;
                }
                Err(std_mpsc::TryRecvError::Empty) => return glib::ControlFlow::Continue,
            }
        }
    });

    main_loop.run();
    debug!("GTK main loop finished");
}

/// Widgets of the prompt window. Cloning clones the GTK references.
#[derive(Clone)]
struct Dialog {
    window: gtk4::Window,
    entry: gtk4::PasswordEntry,
    remember: gtk4::CheckButton,
    remember_toggled: Rc<glib::SignalHandlerId>,
    stored_note: gtk4::Label,
    cancel_button: gtk4::Button,
    ok_button: gtk4::Button,
    events: UnboundedSender<Intent>,
}

impl Dialog {
    fn build(view: &SessionView, events: UnboundedSender<Intent>) -> Self {
        let window = gtk4::Window::builder()
            .title("ssh-askpass")
            .default_width(420)
            .modal(true)
            .resizable(false)
            .build();

        let vbox = gtk4::Box::builder()
            .orientation(gtk4::Orientation::Vertical)
            .spacing(12)
            .margin_top(20)
            .margin_bottom(20)
            .margin_start(20)
            .margin_end(20)
            .build();

        let message = gtk4::Label::builder()
            .label(view.message.as_str())
            .wrap(true)
            .xalign(0.0)
            .build();
        vbox.append(&message);

        let entry = gtk4::PasswordEntry::builder()
            .show_peek_icon(true)
            .visible(view.secret_field_visible)
            .build();
        vbox.append(&entry);

        let remember = gtk4::CheckButton::builder()
            .label("Remember in keychain")
            .visible(view.remember_visible)
            .sensitive(view.remember_enabled)
            .active(view.remember_checked)
            .build();
        vbox.append(&remember);
        let remember_toggled = {
            let events = events.clone();
            remember.connect_toggled(move |check| {
                let _ = events.send(Intent::ToggleRemember(check.is_active()));
            })
        };

        let stored_note = gtk4::Label::builder()
            .label("A passphrase for this key is already stored. Remembering asks before replacing it.")
            .xalign(0.0)
            .css_classes(["dim-label"])
            .visible(false)
            .build();
        vbox.append(&stored_note);

        let button_box = gtk4::Box::builder()
            .orientation(gtk4::Orientation::Horizontal)
            .spacing(12)
            .halign(gtk4::Align::End)
            .margin_top(12)
            .build();
        let cancel_button = gtk4::Button::builder().label(view.cancel_label.as_str()).build();
        let ok_button = gtk4::Button::builder()
            .label("OK")
            .visible(view.accept_visible)
            .build();
        button_box.append(&cancel_button);
        button_box.append(&ok_button);
        vbox.append(&button_box);

        window.set_child(Some(&vbox));

        let dialog = Self {
            window,
            entry,
            remember,
            remember_toggled: Rc::new(remember_toggled),
            stored_note,
            cancel_button,
            ok_button,
            events,
        };
        dialog.connect_signals(view.variant);
        dialog
    }

    fn connect_signals(&self, variant: PromptVariant) {
        let events = self.events.clone();
        self.entry.connect_changed(move |entry| {
            let _ = events.send(Intent::UpdateSecret(SecretString::from(
                entry.text().to_string(),
            )));
        });

        let events = self.events.clone();
        self.cancel_button.connect_clicked(move |_| {
            let _ = events.send(Intent::Cancel);
        });

        let events = self.events.clone();
        self.ok_button.connect_clicked(move |_| {
            let _ = events.send(Intent::Accept);
        });

        // Closing the window is a cancel; the runner destroys it afterwards.
        let events = self.events.clone();
        self.window.connect_close_request(move |_| {
            let _ = events.send(Intent::Cancel);
            glib::Propagation::Stop
        });

        let keys = gtk4::EventControllerKey::new();
        keys.set_propagation_phase(gtk4::PropagationPhase::Capture);
        let events = self.events.clone();
        keys.connect_key_pressed(move |_, key, _, _| match key {
            Key::Return | Key::KP_Enter => {
                let _ = events.send(Intent::ActivateDefault);
                glib::Propagation::Stop
            }
            Key::Tab | Key::ISO_Left_Tab | Key::Left | Key::Right
                if variant == PromptVariant::Confirmation =>
            {
                let _ = events.send(Intent::AdvanceFocus);
                glib::Propagation::Stop
            }
            _ => glib::Propagation::Proceed,
        });
        self.window.add_controller(keys);
    }

    fn render(&self, view: &SessionView) {
        self.cancel_button.set_label(&view.cancel_label);
        self.ok_button.set_visible(view.accept_visible);

        self.remember.set_visible(view.remember_visible);
        self.remember.set_sensitive(view.remember_enabled);
        // Programmatic updates are not user toggles.
        if self.remember.is_active() != view.remember_checked {
            self.remember.block_signal(&self.remember_toggled);
            self.remember.set_active(view.remember_checked);
            self.remember.unblock_signal(&self.remember_toggled);
        }
        self.stored_note
            .set_visible(view.remember_visible && view.entry_exists);

        let (default, other) = match view.default_control {
            Control::Ok => (&self.ok_button, &self.cancel_button),
            Control::Cancel => (&self.cancel_button, &self.ok_button),
        };
        default.add_css_class("suggested-action");
        other.remove_css_class("suggested-action");

        if view.secret_field_visible {
            self.entry.grab_focus();
        } else {
            match view.focused {
                Control::Ok => self.ok_button.grab_focus(),
                Control::Cancel => self.cancel_button.grab_focus(),
            };
        }
    }

    fn confirm_replace(&self, account: &str) {
        let alert = gtk4::AlertDialog::builder()
            .modal(true)
            .message(REPLACE_TITLE)
            .detail(replace_question(account))
            .buttons(["Replace", "Cancel"])
            .default_button(0)
            .cancel_button(1)
            .build();

        let events = self.events.clone();
        alert.choose(Some(&self.window), gio::Cancellable::NONE, move |result| {
            let choice = match result {
                Ok(0) => ReplaceChoice::Replace,
                _ => ReplaceChoice::KeepEditing,
            };
            let _ = events.send(Intent::ResolveDuplicate(choice));
        });
    }

    fn show_error(&self, title: &str, message: &str) {
        gtk4::AlertDialog::builder()
            .modal(true)
            .message(title)
            .detail(message)
            .buttons(["OK"])
            .build()
            .show(Some(&self.window));
    }
}
