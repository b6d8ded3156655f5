use std::io::{BufRead, Write};
use std::time::Duration;

use coach_client::sources::build_source;
use coach_client::{ActionOutcome, ApiClient, AuthOutcome, ClientConfig};
use coach_core::NotificationStore;
use coach_core::models::{RegisterRequest, User};
use coach_core::notifications::NotificationEvent;
use coach_core::notifications::source::{NotificationSourceKind, spawn_feed};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{Cli, Commands};
use crate::{Error, Result};

pub async fn dispatch(args: Cli) -> Result<()> {
    let client = build_client(&args)?;

    match args.command {
        Commands::Login { email, password } => {
            let password = password_or_prompt(password)?;
            report_auth(client.login(&email, &password).await)
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
            role,
        } => {
            let request = RegisterRequest {
                first_name,
                last_name,
                email,
                password: password_or_prompt(password)?,
                role,
                ..Default::default()
            };
            report_auth(client.register(&request).await)
        }
        Commands::Logout => {
            client.logout();
            println!("Signed out");
            Ok(())
        }
        Commands::Whoami => {
            match client.bootstrap().await? {
                Some(user) => println!("{}", describe(&user)),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Commands::ChangePassword { current, new } => {
            require_session(&client).await?;
            report_action(
                client.change_password(&current, &new).await,
                "Password changed",
            )
        }
        Commands::ForgotPassword { email } => report_action(
            client.forgot_password(&email).await,
            "Password reset email sent",
        ),
        Commands::ResetPassword { token, password } => report_action(
            client.reset_password(&token, &password).await,
            "Password reset",
        ),
        Commands::VerifyEmail { token } => {
            report_action(client.verify_email(&token).await, "Email verified")
        }
        Commands::Watch {
            source,
            interval,
            count,
        } => watch(&client, source, interval, count).await,
    }
}

/// Environment first, then command-line overrides.
fn build_client(args: &Cli) -> Result<ApiClient> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &args.api_url {
        config = config.with_api_url(url)?;
    }
    if let Some(path) = &args.token_file {
        config.token_file = path.clone();
    }
    Ok(ApiClient::builder(config).build()?)
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(Error::Custom("A password is required".into()));
    }
    Ok(password)
}

fn describe(user: &User) -> String {
    match user.role {
        Some(role) => format!("{} ({role})", user.display_name()),
        None => user.display_name(),
    }
}

fn report_auth(outcome: AuthOutcome) -> Result<()> {
    match outcome {
        AuthOutcome::Success { user } => {
            println!("Signed in as {}", describe(&user));
            Ok(())
        }
        AuthOutcome::Failure { error } => Err(error.into()),
    }
}

fn report_action(outcome: ActionOutcome, done: &str) -> Result<()> {
    match outcome {
        ActionOutcome::Success { message } => {
            println!("{}", message.as_deref().unwrap_or(done));
            Ok(())
        }
        ActionOutcome::Failure { error } => Err(error.into()),
    }
}

async fn require_session(client: &ApiClient) -> Result<User> {
    client
        .bootstrap()
        .await?
        .ok_or_else(|| Error::Custom("Not signed in. Run `coach login` first.".into()))
}

async fn watch(
    client: &ApiClient,
    source: Option<NotificationSourceKind>,
    interval: Option<u64>,
    count: Option<usize>,
) -> Result<()> {
    let kind = source.unwrap_or(client.config().notification_source);
    let period = interval
        .map(Duration::from_secs)
        .unwrap_or(client.config().notification_interval);
    if period.is_zero() {
        return Err(Error::Custom("--interval must be at least 1 second".into()));
    }
    if count == Some(0) {
        return Err(Error::Custom("--count must be at least 1".into()));
    }
    if kind != NotificationSourceKind::Simulated {
        require_session(client).await?;
    }

    let store = NotificationStore::shared();
    let mut events = store.read().await.subscribe();
    let cancel = CancellationToken::new();
    let mut feed = spawn_feed(
        build_source(kind, client, period),
        store.clone(),
        cancel.clone(),
    );
    info!(source = %kind, period_secs = period.as_secs(), "watching notifications");

    let mut shown = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut feed => {
                warn!("notification feed ended");
                break;
            }
            event = events.recv() => match event {
                Ok(NotificationEvent::Toast(notification)) => {
                    println!(
                        "[{}] {}: {}",
                        notification.kind, notification.title, notification.message
                    );
                    shown += 1;
                    if count.is_some_and(|max| shown >= max) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "missed notifications"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    cancel.cancel();

    let unread = store.read().await.unread_count();
    println!("{shown} notification(s), {unread} unread");
    Ok(())
}
