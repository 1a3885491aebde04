use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall::auth::{AuthContext, FileCredentials, StaticCredentials, StoredCredentials, UserProfile};
use rollcall::config::{self, Config, LogFormat};
use rollcall::display;
use rollcall::errors::NotifyError;
use rollcall::grouping;
use rollcall::models::notification::{NotificationId, NotificationRecord, ReadFilter, Scope};
use rollcall::reconcile::Change;
use rollcall::session::{NotificationSession, Update};
use rollcall::transport::push::ReconnectPolicy;
use rollcall::transport::rest::{CourseMessage, RestClient};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(cfg.log_format);

    let args = cli::Cli::parse();
    let result = run(cfg, args).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<NotifyError>() {
                Some(NotifyError::Unauthorized) => {
                    eprintln!("{}", NotifyError::Unauthorized.user_message());
                    eprintln!("Run `rollcall login --token <TOKEN>` to sign in.");
                }
                Some(err) => eprintln!("{}", err.user_message()),
                None => eprintln!("Error: {:?}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "rollcall=info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run(cfg: Config, args: cli::Cli) -> anyhow::Result<()> {
    let files = FileCredentials::new(cfg.credentials_path.clone());

    let command = match args.command.unwrap_or(cli::Commands::Inbox { unread: false }) {
        cli::Commands::Login { token, username, role } => {
            files.write(&StoredCredentials {
                access_token: Some(token),
                refresh_token: None,
                user_profile: Some(UserProfile {
                    username,
                    role,
                    ..Default::default()
                }),
            })?;
            println!("Saved credentials to {}", files.path().display());
            return Ok(());
        }
        cli::Commands::Logout => {
            files.clear()?;
            println!("Logged out.");
            return Ok(());
        }
        other => other,
    };

    let auth: Arc<dyn AuthContext> = match args.token {
        Some(token) => Arc::new(StaticCredentials::new(token, None)),
        None => Arc::new(files),
    };
    let api = Arc::new(RestClient::new(&cfg.api_url, cfg.request_timeout)?);
    let mut session = NotificationSession::new(auth, api);

    let result = match command {
        cli::Commands::Inbox { unread } => {
            session.mount(Scope::Inbox).await?;
            let filter = if unread { ReadFilter::Unread } else { ReadFilter::All };
            print_inbox(&session, filter);
            Ok(())
        }
        cli::Commands::Sent { raw } => {
            session.mount(Scope::Sent).await?;
            print_sent(session.store().records(), raw);
            Ok(())
        }
        cli::Commands::Watch => {
            let policy = if cfg.push_reconnect {
                ReconnectPolicy::exponential(cfg.push_max_backoff)
            } else {
                ReconnectPolicy::disabled()
            }
            .with_connect_timeout(cfg.request_timeout);
            session = session.with_push(cfg.ws_url.clone(), policy);
            watch(&mut session).await
        }
        cli::Commands::Read { id } => {
            session.mount(Scope::Inbox).await?;
            let id = NotificationId::new(id.trim());
            if session.store().get(&id).is_none() {
                tracing::warn!(id = %id, "notification not in current inbox");
            }
            session.mark_read(&id).await?;
            println!("Marked {} as read. Unread: {}", id, session.unread_count());
            Ok(())
        }
        cli::Commands::ReadAll => {
            session.mount(Scope::Inbox).await?;
            match session.mark_all_read().await? {
                Change::MarkedAllRead { updated: 0 } => println!("Nothing to mark."),
                _ => println!("All notifications marked as read!"),
            }
            Ok(())
        }
        cli::Commands::Send { course, title, message } => {
            let message = CourseMessage::new(course, title, message)?;
            session.send_course(&message).await?;
            println!("Notification sent successfully to all students in this course!");
            Ok(())
        }
        cli::Commands::Login { .. } | cli::Commands::Logout => Ok(()),
    };

    session.unmount().await;
    result
}

async fn watch(session: &mut NotificationSession) -> anyhow::Result<()> {
    session.mount(Scope::Inbox).await?;
    print_inbox(session, ReadFilter::All);

    if !session.is_live() {
        println!("Live updates unavailable.");
        return Ok(());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                return Ok(());
            }
            update = session.next_update() => match update {
                Err(e) => report_transient(e)?,
                Ok(Some(Update::Applied(Change::Inserted(id)))) => {
                    if let Some(record) = session.store().get(&id) {
                        println!("{}", format_line(record));
                    }
                    print_badge(session.unread_count());
                }
                Ok(Some(Update::Applied(change))) if !change.is_noop() => {
                    print_badge(session.unread_count());
                }
                Ok(Some(Update::Applied(_))) => {}
                Ok(Some(Update::Resynced { .. })) => {
                    print_inbox(session, ReadFilter::All);
                }
                Ok(None) => {
                    println!("Live updates stopped.");
                    return Ok(());
                }
            },
        }
    }
}

/// A failed re-fetch mid-watch is shown and the watch goes on; only an
/// expired session ends it.
fn report_transient(err: NotifyError) -> anyhow::Result<()> {
    if err.is_unauthorized() {
        return Err(err.into());
    }
    tracing::warn!(error = %err, "update failed during watch");
    eprintln!("{}", err.user_message());
    Ok(())
}

fn print_inbox(session: &NotificationSession, filter: ReadFilter) {
    let name = session
        .profile()
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| "User".to_string());
    println!("Notifications for {}", name);
    print_badge(session.unread_count());

    let mut shown = 0;
    for record in session.store().filtered(filter) {
        println!("{}", format_line(record));
        shown += 1;
    }
    if shown == 0 {
        println!("No notifications.");
    }
}

fn print_badge(unread: usize) {
    match display::badge_label(unread) {
        Some(label) => println!("[{} unread]", label),
        None => println!("[all caught up]"),
    }
}

fn format_line(record: &NotificationRecord) -> String {
    let marker = if record.is_read { " " } else { "*" };
    let course = display::course_display(record)
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default();
    format!(
        "{} {:<6} {:<12} {}{} - {}",
        marker,
        record.id,
        display::relative_time(record.created_at, Utc::now()),
        display::display_title(record),
        course,
        display::sender_display(record),
    )
}

fn print_sent(records: &[NotificationRecord], raw: bool) {
    if records.is_empty() {
        println!("No sent notifications.");
        return;
    }

    if raw {
        for r in records {
            println!(
                "{:<6} {:<30} {}",
                r.id,
                r.recipient_email.as_deref().unwrap_or("-"),
                display::display_title(r)
            );
        }
        return;
    }

    for group in grouping::group_sent(records) {
        let title = group
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| group.message.chars().take(50).collect());
        println!(
            "{:<12} {} ({} recipients, {} read)",
            display::relative_time(group.created_at, Utc::now()),
            title,
            group.recipient_count,
            group.read_count,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failure_keeps_watching() {
        let err = NotifyError::Transport {
            status: Some(503),
            message: "Service Unavailable".into(),
        };
        assert!(report_transient(err).is_ok());
        assert!(report_transient(NotifyError::transport("connection reset")).is_ok());
    }

    #[test]
    fn test_expired_session_ends_watch() {
        let err = report_transient(NotifyError::Unauthorized).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NotifyError>(),
            Some(NotifyError::Unauthorized)
        ));
    }
}
