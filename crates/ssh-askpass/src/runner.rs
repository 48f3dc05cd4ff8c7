//! The prompt event loop.
//!
//! One task owns the [`PromptSession`]. Presenters send [`Intent`]s over an
//! unbounded channel and the countdown ticker sends ticks over a second one;
//! the loop applies exactly one message at a time and forwards the resulting
//! [`Effect`] to the presenter. Nothing else touches the session, so a tick
//! and a button press can never interleave.

use std::time::Duration;

use ssh_askpass_core::{
    CancelToken, CountdownTimer, CredentialStore, Effect, Intent, Outcome, PreferenceStore,
    PromptError, PromptSession, Presenter,
};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, trace};

/// Spawn the countdown ticker.
///
/// Sends one tick per `period` until `token` is cancelled or the receiver
/// is gone. The first tick arrives one full period after spawning.
pub fn spawn_ticker(
    token: CancelToken,
    period: Duration,
    ticks: UnboundedSender<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        loop {
            interval.tick().await;
            if token.is_cancelled() {
                trace!("Ticker stopped");
                break;
            }
            if ticks.send(()).is_err() {
                break;
            }
        }
    })
}

/// Drive `session` with `presenter` until it produces an outcome.
///
/// If the presenter hangs up and no countdown is running, the session is
/// cancelled.
///
/// # Errors
///
/// Returns the presenter's error if the dialog cannot be opened.
pub async fn run_session<S, P, R>(
    mut session: PromptSession<S, P>,
    presenter: &mut R,
) -> Result<Outcome, PromptError>
where
    S: CredentialStore,
    P: PreferenceStore,
    R: Presenter + ?Sized,
{
    let (intent_tx, mut intents) = mpsc::unbounded_channel::<Intent>();
    let (tick_tx, mut ticks) = mpsc::unbounded_channel::<()>();

    let ticker = match session.countdown_token() {
        Some(token) if session.countdown_running() => {
            Some(spawn_ticker(token, CountdownTimer::PERIOD, tick_tx))
        }
        _ => {
            drop(tick_tx);
            None
        }
    };

    if let Err(e) = presenter.open(&session.view(), intent_tx) {
        if let Some(ticker) = ticker {
            ticker.abort();
        }
        return Err(e);
    }
    debug!(variant = %session.request().variant, "Dialog open");

    let outcome = loop {
        let effect = tokio::select! {
            Some(intent) = intents.recv() => session.apply(intent),
            Some(()) = ticks.recv() => session.tick(),
            else => {
                debug!("All event sources closed, cancelling");
                session.cancel()
            }
        };

        match effect {
            Effect::Unchanged => {}
            Effect::Render => presenter.render(&session.view()),
            Effect::ConfirmReplace { account } => presenter.confirm_replace(&account),
            Effect::ShowError { title, message } => presenter.show_error(&title, &message),
            Effect::Exit(outcome) => break outcome,
        }
    };

    if let Some(ticker) = ticker {
        ticker.abort();
    }
    presenter.close();

    debug!(exit_code = outcome.exit_code(), "Session finished");
    Ok(outcome)
}
