use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use portal_client::net::api::{ApiClient, ApiError, DEFAULT_TIMEOUT};
use portal_client::state::session::{RefreshOutcome, RefreshStatus, SessionStore};
use portal_client::util::storage::FileStorage;
use serde_json::{Value, json};

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("not logged in; run `portal-cli login` first")]
    NotLoggedIn,
    #[error("session expired; log in again")]
    SessionExpired,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "portal-cli", about = "Project portal auth CLI")]
struct Cli {
    #[arg(long, env = "PORTAL_BASE_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Directory holding the persisted session.
    #[arg(long, env = "PORTAL_STATE_DIR", default_value = ".portal")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    Register(CredentialArgs),
    Login(CredentialArgs),
    Refresh,
    Whoami,
    Status,
    Logout,
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long, env = "PORTAL_EMAIL")]
    email: String,

    #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
    password: String,
}

impl Command {
    /// Route the command stands in for when the session bootstraps.
    fn route(&self) -> &'static str {
        match self {
            Self::Login(_) => "/login",
            Self::Register(_) => "/register",
            _ => "/cli",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api = ApiClient::new(&cli.base_url, DEFAULT_TIMEOUT)?;
    let store = SessionStore::new(Arc::new(FileStorage::new(&cli.state_dir)));
    let boot = store.bootstrap(&api, cli.command.route()).await;

    match cli.command {
        Command::Ping => run_ping(&api).await,
        Command::Register(args) => run_register(&api, args).await,
        Command::Login(args) => run_login(&api, &store, args).await,
        Command::Refresh => run_refresh(boot.refresh),
        Command::Whoami => run_whoami(&api, &store).await,
        Command::Status => print_json(&status_json(&store, &boot.refresh)),
        Command::Logout => {
            store.clear();
            println!("logged out");
            Ok(())
        }
    }
}

async fn run_ping(api: &ApiClient) -> Result<(), CliError> {
    let body = api.ping().await?;
    println!("{body}");
    Ok(())
}

async fn run_register(api: &ApiClient, args: CredentialArgs) -> Result<(), CliError> {
    let message = api.register(&args.email, &args.password).await?;
    println!("{message}");
    Ok(())
}

async fn run_login(api: &ApiClient, store: &SessionStore, args: CredentialArgs) -> Result<(), CliError> {
    let session = api.login(&args.email, &args.password).await?;
    println!("{} as {}", session.message, session.user.email);
    store.apply_session(session);
    Ok(())
}

/// Bootstrap already ran the one refresh this process makes; report it.
fn run_refresh(status: RefreshStatus) -> Result<(), CliError> {
    match status {
        RefreshStatus::Ran(RefreshOutcome::Refreshed) => {
            println!("token refreshed");
            Ok(())
        }
        RefreshStatus::Ran(RefreshOutcome::SignedOut) => Err(CliError::SessionExpired),
        RefreshStatus::Ran(RefreshOutcome::NoSession | RefreshOutcome::Superseded) | RefreshStatus::Skipped => {
            Err(CliError::NotLoggedIn)
        }
        RefreshStatus::Failed(e) => Err(e.into()),
    }
}

async fn run_whoami(api: &ApiClient, store: &SessionStore) -> Result<(), CliError> {
    let credential = store.credential().ok_or(CliError::NotLoggedIn)?;
    match api.me(&credential).await {
        Ok(user) => {
            store.set_user(Some(user.clone()));
            print_json(&serde_json::to_value(user)?)
        }
        Err(e) if e.is_unauthorized() => {
            store.clear();
            Err(CliError::SessionExpired)
        }
        Err(e) => Err(e.into()),
    }
}

fn refresh_label(status: &RefreshStatus) -> String {
    match status {
        RefreshStatus::Skipped => "skipped".to_owned(),
        RefreshStatus::Ran(RefreshOutcome::Refreshed) => "refreshed".to_owned(),
        RefreshStatus::Ran(RefreshOutcome::SignedOut) => "signed_out".to_owned(),
        RefreshStatus::Ran(RefreshOutcome::NoSession) => "no_session".to_owned(),
        RefreshStatus::Ran(RefreshOutcome::Superseded) => "superseded".to_owned(),
        RefreshStatus::Failed(e) => format!("failed: {e}"),
    }
}

fn status_json(store: &SessionStore, refresh: &RefreshStatus) -> Value {
    let state = store.snapshot();
    json!({
        "authenticated": state.is_authenticated,
        "hydrated": state.hydrated,
        "user": state.user,
        "refresh": refresh_label(refresh),
    })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
