//! # callboard
//!
//! Callboard client binary. Wires settings, logging, the session manager and
//! the real-time synchronizer behind a few terminal commands.

#![deny(unsafe_code)]

mod app;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use callboard_core::types::{
    CallFilters, CallStatus, ConversationFilters, ConversationStatus, LoginRequest, PageRequest,
};
use callboard_session::Rehydration;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::app::App;

/// Callboard client.
#[derive(Parser, Debug)]
#[command(name = "callboard", about = "Call management dashboard client")]
struct Cli {
    /// Settings file (defaults to `~/.callboard/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log filter, overriding the configured level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session.
    Login {
        /// Account email.
        #[arg(long)]
        email: String,

        /// Account password.
        #[arg(long)]
        password: String,

        /// Ask the server for a long-lived session.
        #[arg(long)]
        remember_me: bool,
    },

    /// Sign out and forget the stored session.
    Logout,

    /// Show the stored session.
    Status,

    /// List calls.
    Calls {
        /// Only these statuses (comma separated, e.g. `active,ringing`).
        #[arg(long, value_delimiter = ',', value_parser = parse_status::<CallStatus>)]
        status: Vec<CallStatus>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// List conversations.
    Conversations {
        /// Only these statuses (comma separated, e.g. `waiting,escalated`).
        #[arg(long, value_delimiter = ',', value_parser = parse_status::<ConversationStatus>)]
        status: Vec<ConversationStatus>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Show dashboard statistics.
    Stats,

    /// Follow real-time updates until Ctrl-C.
    Watch,
}

#[derive(clap::Args, Debug)]
struct PageArgs {
    /// 1-based page.
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Page size.
    #[arg(long, default_value_t = 20)]
    limit: u32,
}

impl From<PageArgs> for PageRequest {
    fn from(args: PageArgs) -> Self {
        Self {
            page: args.page.max(1),
            limit: args.limit.max(1),
            ..Self::default()
        }
    }
}

/// Parse a status by its wire name.
fn parse_status<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_string()))
        .map_err(|_| format!("unknown status `{s}`"))
}

fn load_settings(path: Option<&PathBuf>) -> Result<callboard_settings::ClientSettings> {
    match path {
        Some(path) => callboard_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => callboard_settings::load_settings().with_context(|| {
            format!(
                "Failed to load settings from {}",
                callboard_settings::settings_path().display()
            )
        }),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings = load_settings(args.settings.as_ref())?;
    let level = args.log_level.as_deref().unwrap_or(&settings.logging.level);
    callboard_core::logging::init_subscriber(level);

    let app = App::new(settings)?;
    match args.command {
        Command::Login {
            email,
            password,
            remember_me,
        } => login(&app, email, password, remember_me).await,
        Command::Logout => logout(&app).await,
        Command::Status => {
            status(&app);
            Ok(())
        }
        Command::Calls { status, page } => list_calls(&app, status, page.into()).await,
        Command::Conversations { status, page } => {
            list_conversations(&app, status, page.into()).await
        }
        Command::Stats => stats(&app).await,
        Command::Watch => watch(&app).await,
    }
}

async fn login(app: &App, email: String, password: String, remember_me: bool) -> Result<()> {
    let request = LoginRequest {
        email,
        password,
        remember_me,
    };
    let user = app.session.login(request).await.context("Login failed")?;
    let expires_at = app.session.tokens().map(|t| t.expires_at);
    println!("Signed in as {}", render::user(&user, expires_at));
    app.session.dispose();
    Ok(())
}

async fn logout(app: &App) -> Result<()> {
    if app.session.rehydrate() == Rehydration::Restored {
        app.session.logout_and_wait().await;
    }
    println!("Signed out.");
    Ok(())
}

fn status(app: &App) {
    match app.session.rehydrate() {
        Rehydration::Restored => {
            if let Some(user) = app.session.user() {
                let expires_at = app.session.tokens().map(|t| t.expires_at);
                println!("Signed in as {}", render::user(&user, expires_at));
            }
        }
        Rehydration::Expired => println!("Stored session expired."),
        Rehydration::NoSession => println!("Not signed in."),
    }
    app.session.dispose();
    println!("Data directory: {}", app.data_dir().display());
    println!("Real-time URL:  {}", app.settings.realtime.socket_url);
}

async fn list_calls(app: &App, status: Vec<CallStatus>, page: PageRequest) -> Result<()> {
    app.require_session()?;
    let store = app.call_store();
    if !status.is_empty() {
        store.set_call_filters(CallFilters {
            status: Some(status),
            ..CallFilters::default()
        });
    }
    let _ = store.fetch_calls(page).await.context("Failed to fetch calls")?;
    let out = store.read(|s| render::calls(s.calls().items(), s.calls().pagination()));
    println!("{out}");
    Ok(())
}

async fn list_conversations(
    app: &App,
    status: Vec<ConversationStatus>,
    page: PageRequest,
) -> Result<()> {
    app.require_session()?;
    let store = app.call_store();
    if !status.is_empty() {
        store.set_conversation_filters(ConversationFilters {
            status: Some(status),
            ..ConversationFilters::default()
        });
    }
    let _ = store
        .fetch_conversations(page)
        .await
        .context("Failed to fetch conversations")?;
    let out = store.read(|s| {
        render::conversations(s.conversations().items(), s.conversations().pagination())
    });
    println!("{out}");
    Ok(())
}

async fn stats(app: &App) -> Result<()> {
    app.require_session()?;
    let store = app.call_store();
    let _ = store.fetch_stats().await.context("Failed to fetch stats")?;
    let stats = store.stats().unwrap_or_default();
    println!("{}", render::stats(&stats));
    Ok(())
}

async fn watch(app: &App) -> Result<()> {
    app.require_session()?;
    let feed = app.feed();
    let mut notifications = feed.notifications.subscribe();
    let mut status = feed.realtime.watch_status();

    if let Err(e) = feed.store.refresh_all().await {
        warn!(error = %e, "initial fetch failed");
    }
    let (calls, conversations) = feed
        .store
        .read(|s| (s.calls().len(), s.conversations().len()));
    println!("Loaded {calls} calls and {conversations} conversations. Ctrl-C to stop.");

    let gate = feed.gate.spawn();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res.context("Failed to listen for Ctrl-C")?;
                info!("shutdown requested");
                break;
            }
            note = notifications.recv() => match note {
                Ok(n) => println!("{}", render::notification(&n)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "notification output lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                info!(status = %current, "real-time status");
                if current.degraded {
                    println!("Real-time updates unavailable; lists refresh on the timer only.");
                }
            }
        }
    }

    gate.abort();
    feed.realtime.disconnect();
    app.session.dispose();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "callboard",
            "calls",
            "--status",
            "active,no_answer",
            "--limit",
            "50",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Calls { status, page } => {
                assert_eq!(status, vec![CallStatus::Active, CallStatus::NoAnswer]);
                let req = PageRequest::from(page);
                assert_eq!((req.page, req.limit), (1, 50));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_status() {
        let err = Cli::try_parse_from(["callboard", "calls", "--status", "exploded"]).unwrap_err();
        assert!(err.to_string().contains("unknown status"));
    }

    #[test]
    fn login_requires_credentials() {
        assert!(Cli::try_parse_from(["callboard", "login", "--email", "a@b.c"]).is_err());
        let cli = Cli::try_parse_from([
            "callboard",
            "login",
            "--email",
            "a@b.c",
            "--password",
            "pw",
            "--remember-me",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Login { remember_me: true, .. }));
    }

    #[test]
    fn settings_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"refresh":{"intervalSecs":5}}"#).unwrap();
        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.refresh.interval_secs, 5);
    }

    #[test]
    fn invalid_settings_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_settings(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to load settings"));
    }
}
