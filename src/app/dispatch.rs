use crate::app::pipeline::{Pipeline, RunOptions, build_token_manager};
use crate::app::status::render_status;
use crate::auth::{BrowserPresenter, CredentialStore};
use crate::cli::{Cli, Commands};
use crate::compact::CompactedPayload;
use crate::config::Config;
use crate::error::{AuthError, TaskpushError};
use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::sync::Arc;

/// Interactive unless told otherwise; without a terminal on stdin the
/// browser flow is only allowed when explicitly requested.
pub fn resolve_interactive(non_interactive: bool, interactive: bool, stdin_is_tty: bool) -> bool {
    if non_interactive {
        return false;
    }
    interactive || stdin_is_tty
}

fn print_tasks(payload: &CompactedPayload) {
    for task in payload.tasks() {
        println!("* [P{}] {} // Due: {} // {}", task.prio, task.name, task.due, task.proj);
    }
    if payload.dropped() > 0 {
        println!("({} more not shown)", payload.dropped());
    }
}

async fn run(config: &Config, options: RunOptions) -> Result<()> {
    let pipeline = Pipeline::from_config(config, options)?;
    let report = match pipeline.run().await {
        Ok(report) => report,
        Err(TaskpushError::Auth(AuthError::InteractionRequired)) => {
            anyhow::bail!(
                "No usable Todoist token and this run is non-interactive. Run `taskpush login` from a terminal first."
            );
        }
        Err(TaskpushError::RemoteApi(e)) if e.is_unauthorized() => {
            return Err(anyhow::Error::new(e)
                .context("Todoist rejected the stored token. Run `taskpush login` to re-authorize"));
        }
        Err(e) => return Err(e).context("Run failed"),
    };

    print_tasks(&report.payload);

    match &report.delivery {
        None => {
            let body = serde_json::to_string_pretty(&report.payload)
                .context("Failed to render payload")?;
            println!("{body}");
            println!(
                "Dry run: {} bytes, {} tasks, not posted.",
                report.payload.body_len(),
                report.payload.tasks().len()
            );
        }
        Some(delivery) if delivery.is_success() => println!("Sent to TRMNL: {delivery}"),
        Some(delivery) => println!("TRMNL delivery failed: {delivery}"),
    }
    Ok(())
}

async fn login(config: &Config) -> Result<()> {
    let presenter = Arc::new(BrowserPresenter::new(config.oauth.open_browser));
    let manager = build_token_manager(config, true, presenter);
    manager
        .reauthorize()
        .await
        .context("Authorization failed")?;
    println!(
        "Authorized. Token stored at {}",
        manager.store().path().display()
    );
    Ok(())
}

fn logout(config: &Config) -> Result<()> {
    let store = CredentialStore::from_config(config);
    if store.clear()? {
        println!("Removed stored token {}", store.path().display());
    } else {
        println!("No stored token at {}", store.path().display());
    }
    Ok(())
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run {
            dry_run,
            non_interactive,
            interactive,
        } => {
            let options = RunOptions {
                dry_run,
                interactive: resolve_interactive(
                    non_interactive,
                    interactive,
                    std::io::stdin().is_terminal(),
                ),
            };
            run(&config, options).await
        }
        Commands::Login => login(&config).await,
        Commands::Logout => logout(&config),
        Commands::Status => {
            println!("{}", render_status(&config));
            Ok(())
        }
    }
}
