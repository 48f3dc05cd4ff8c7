//! ssh-askpass - Credential prompt for SSH_ASKPASS.
//!
//! OpenSSH runs this binary when it needs a passphrase, a password or a
//! yes/no answer and has no terminal to ask on. The prompt text comes as
//! arguments, the kind of prompt from `SSH_ASKPASS_PROMPT`, and the
//! auto-cancel countdown for confirmations from `SSH_ASKPASS_TIMEOUT`.
//!
//! # Usage
//!
//! ```bash
//! export SSH_ASKPASS=/path/to/ssh-askpass
//! export SSH_ASKPASS_REQUIRE=prefer
//! ssh-add ~/.ssh/id_ed25519
//! ```
//!
//! On accept the secret is printed to stdout as a single line and the exit
//! code is 0. Cancel, timeout and every setup failure exit with 1. Logs go
//! to stderr.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use secrecy::ExposeSecret;
use ssh_askpass::prompt::TerminalPresenter;
use ssh_askpass::{run_session, KeyringStore};
use ssh_askpass_core::{
    detect_prompt, parse_timeout, Config, CredentialStore, FilePreferenceStore, Frontend,
    MemoryCredentialStore, MemoryPreferenceStore, Outcome, PreferenceStore, Presenter,
    PromptRequest, PromptSession, PromptVariant,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zeroize::Zeroize;

/// Credential prompt for SSH_ASKPASS with keychain integration.
#[derive(Parser, Debug)]
#[command(name = "ssh-askpass")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Prompt text from the calling process
    #[arg(value_name = "PROMPT")]
    prompt: Vec<String>,

    /// Path to config file [default: ~/.config/ssh-askpass/config.toml]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Prompt variant, overriding detection (confirmation, information,
    /// password, passphrase, bad-passphrase, input-confirmation)
    #[arg(long, value_name = "VARIANT")]
    variant: Option<PromptVariant>,

    /// Keychain account for the secret, overriding detection
    #[arg(long, value_name = "ACCOUNT")]
    account: Option<String>,

    /// Dialog implementation [default: from config, else auto]
    #[arg(long, value_enum)]
    frontend: Option<FrontendArg>,

    /// Where remembered secrets go
    #[arg(long, value_enum, default_value_t = StoreKind::Keyring)]
    store: StoreKind,

    /// Prompt kind requested by ssh (confirm, none)
    #[arg(long, env = "SSH_ASKPASS_PROMPT", hide = true)]
    prompt_hint: Option<String>,

    /// Auto-cancel countdown for confirmations, in seconds
    #[arg(long, env = "SSH_ASKPASS_TIMEOUT", hide = true)]
    timeout: Option<String>,

    /// Increase log verbosity (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FrontendArg {
    Auto,
    Terminal,
    Gtk,
}

impl From<FrontendArg> for Frontend {
    fn from(arg: FrontendArg) -> Self {
        match arg {
            FrontendArg::Auto => Frontend::Auto,
            FrontendArg::Terminal => Frontend::Terminal,
            FrontendArg::Gtk => Frontend::Gtk,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    /// The platform keychain
    Keyring,
    /// Process memory; nothing is persisted (dry run)
    Memory,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn setup_logging(level: &str) {
    // RUST_LOG wins over the CLI flags. Stdout is reserved for the secret.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration from specified path");
            Config::load_from(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => {
            if let Some(path) = Config::default_path() {
                debug!(path = %path.display(), "Loading configuration from default path");
            }
            Config::load().context("Failed to load configuration")
        }
    }
}

/// Build the request from arguments and the askpass environment.
fn build_request(cli: &Cli) -> PromptRequest {
    let message = cli.prompt.join(" ");
    let detection = detect_prompt(&message, cli.prompt_hint.as_deref());
    let timeout = parse_timeout(cli.timeout.as_deref());
    let mut request = detection.into_request(message, timeout);

    if let Some(variant) = cli.variant {
        request.variant = variant;
    }
    if let Some(account) = &cli.account {
        request.account = account.clone();
    }
    request
}

fn open_stores(
    kind: StoreKind,
    config: &Config,
) -> (Box<dyn CredentialStore>, Arc<dyn PreferenceStore>) {
    match kind {
        StoreKind::Memory => (
            Box::new(MemoryCredentialStore::new()),
            Arc::new(MemoryPreferenceStore::new()),
        ),
        StoreKind::Keyring => {
            let store: Box<dyn CredentialStore> =
                Box::new(KeyringStore::new(config.store.service.clone()));
            let prefs: Arc<dyn PreferenceStore> = match config.preferences_path() {
                Some(path) => {
                    debug!(path = %path.display(), "Using preference file");
                    Arc::new(FilePreferenceStore::new(path))
                }
                None => {
                    warn!("No preference directory, remember choice will not persist");
                    Arc::new(MemoryPreferenceStore::new())
                }
            };
            (store, prefs)
        }
    }
}

#[cfg(feature = "gtk")]
fn gtk_presenter() -> Result<Box<dyn Presenter>> {
    let presenter = ssh_askpass::prompt::Gtk4Presenter::spawn()
        .context("Failed to start GTK dialog")?;
    Ok(Box::new(presenter))
}

#[cfg(not(feature = "gtk"))]
fn gtk_presenter() -> Result<Box<dyn Presenter>> {
    anyhow::bail!("GTK dialog requested but this build has no GTK support")
}

#[cfg(feature = "gtk")]
fn gtk_if_display() -> Option<Box<dyn Presenter>> {
    if !ssh_askpass::prompt::Gtk4Presenter::display_available() {
        return None;
    }
    match gtk_presenter() {
        Ok(presenter) => Some(presenter),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Falling back to terminal");
            None
        }
    }
}

#[cfg(not(feature = "gtk"))]
fn gtk_if_display() -> Option<Box<dyn Presenter>> {
    None
}

fn select_presenter(frontend: Frontend) -> Result<Box<dyn Presenter>> {
    debug!(frontend = %frontend, "Selecting dialog");
    match frontend {
        Frontend::Gtk => gtk_presenter(),
        Frontend::Terminal => Ok(Box::new(TerminalPresenter::new())),
        Frontend::Auto => Ok(gtk_if_display().unwrap_or_else(|| Box::new(TerminalPresenter::new()))),
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    let config = load_config(cli.config.as_deref())?;
    let request = build_request(&cli);
    info!(
        variant = %request.variant,
        account = %request.account,
        timeout = request.timeout_secs,
        "Prompt requested"
    );

    let (store, prefs) = open_stores(cli.store, &config);
    let frontend = cli.frontend.map(Frontend::from).unwrap_or(config.prompt.frontend);
    let mut presenter = select_presenter(frontend)?;

    let session = PromptSession::new(request, store, prefs, config.prompt.default_remember);
    let outcome = run_session(session, presenter.as_mut())
        .await
        .context("Failed to show the prompt")?;
    Ok(outcome)
}

/// Print the secret, if any, and map the outcome to the exit code.
fn emit(outcome: &Outcome) -> ExitCode {
    if let Some(secret) = outcome.secret() {
        let mut line = format!("{}\n", secret.expose_secret());
        let mut stdout = std::io::stdout().lock();
        let written = stdout
            .write_all(line.as_bytes())
            .and_then(|()| stdout.flush());
        line.zeroize();

        if let Err(e) = written {
            error!(error = %e, "Failed to write secret to stdout");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::from(outcome.exit_code())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures.
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    setup_logging(cli.log_level());
    debug!(version = env!("CARGO_PKG_VERSION"), "Starting ssh-askpass");

    match run(cli).await {
        Ok(outcome) => emit(&outcome),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["ssh-askpass", "--prompt-hint", "", "--timeout", ""];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn prompt_words_are_joined() {
        let cli = parse(&["Enter", "passphrase", "for", "/home/u/.ssh/id_rsa:"]);
        let request = build_request(&cli);
        assert_eq!(request.variant, PromptVariant::Passphrase);
        assert_eq!(request.account, "/home/u/.ssh/id_rsa");
        assert_eq!(request.message, "Enter passphrase for /home/u/.ssh/id_rsa:");
        assert_eq!(request.timeout_secs, 0);
    }

    #[test]
    fn confirm_hint_and_timeout() {
        let cli = Cli::try_parse_from([
            "ssh-askpass",
            "--prompt-hint",
            "confirm",
            "--timeout",
            "30",
            "Allow use of key?",
        ])
        .unwrap();
        let request = build_request(&cli);
        assert_eq!(request.variant, PromptVariant::Confirmation);
        assert_eq!(request.timeout_secs, 30);
        assert!(request.countdown_armed());
    }

    #[test]
    fn bad_timeout_means_no_countdown() {
        let cli = Cli::try_parse_from([
            "ssh-askpass",
            "--prompt-hint",
            "confirm",
            "--timeout",
            "soon",
        ])
        .unwrap();
        assert_eq!(build_request(&cli).timeout_secs, 0);
    }

    #[test]
    fn overrides_win_over_detection() {
        let cli = parse(&[
            "--variant",
            "bad-passphrase",
            "--account",
            "work-key",
            "user@host's password:",
        ]);
        let request = build_request(&cli);
        assert_eq!(request.variant, PromptVariant::BadPassphrase);
        assert_eq!(request.account, "work-key");
    }

    #[test]
    fn unknown_variant_is_usage_error() {
        let err = Cli::try_parse_from(["ssh-askpass", "--variant", "telepathy"]).unwrap_err();
        assert!(err.use_stderr());
    }

    #[test]
    fn help_is_not_an_error() {
        let err = Cli::try_parse_from(["ssh-askpass", "--help"]).unwrap_err();
        assert!(!err.use_stderr());
    }

    #[test]
    fn log_levels() {
        assert_eq!(parse(&[]).log_level(), "warn");
        assert_eq!(parse(&["-v"]).log_level(), "info");
        assert_eq!(parse(&["-vv"]).log_level(), "debug");
        assert_eq!(parse(&["-vvv"]).log_level(), "trace");
        assert_eq!(parse(&["-q", "-vv"]).log_level(), "error");
    }

    #[test]
    fn frontend_flag_maps_to_config() {
        assert_eq!(Frontend::from(FrontendArg::Gtk), Frontend::Gtk);
        let cli = parse(&["--frontend", "terminal"]);
        assert_eq!(cli.frontend.map(Frontend::from), Some(Frontend::Terminal));
    }

    #[test]
    fn explicit_config_errors_are_reported() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[prompt]\nfrontend = 42").unwrap();
        assert!(load_config(Some(file.path())).is_err());

        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn memory_store_is_isolated() {
        let (store, prefs) = open_stores(StoreKind::Memory, &Config::default());
        assert!(!store.query("anything"));
        assert_eq!(prefs.get_bool("remember_in_store"), None);
    }

    #[test]
    fn gtk_dialog_is_built_by_default() {
        let manifest: toml::Table =
            toml::from_str(include_str!("../Cargo.toml")).unwrap();
        let defaults = manifest["features"]["default"].as_array().unwrap();
        assert!(defaults.iter().any(|feature| feature.as_str() == Some("gtk")));
    }

    #[test]
    fn gtk_without_support_fails() {
        if cfg!(not(feature = "gtk")) {
            assert!(select_presenter(Frontend::Gtk).is_err());
        }
    }

    #[tokio::test]
    async fn dry_run_with_terminal_requires_tty() {
        // Only meaningful without a controlling terminal, as in CI.
        if TerminalPresenter::is_available() {
            return;
        }
        let cli = parse(&["--store", "memory", "--frontend", "terminal", "Password:"]);
        assert!(run(cli).await.is_err());
    }
}
