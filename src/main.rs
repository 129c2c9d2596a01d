use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use inbox_reminder::channels::{GmailReader, SlackWebhookNotifier};
use inbox_reminder::config::RunConfig;
use inbox_reminder::pipeline::ReminderRun;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Reminder run failed: {e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    // Usage: inbox-reminder [config.json]
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config =
        RunConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    tracing::info!(
        owner = %config.policy.owner_identity(),
        thresholds = ?config.policy.thresholds_days(),
        max_results = config.settings.max_results,
        timeout_secs = config.settings.run_timeout.as_secs(),
        "Starting reminder run"
    );

    let reader = GmailReader::new(
        config.access_token.clone(),
        config.gmail_api_base.clone(),
        config.request_timeout,
    )
    .context("Failed to create mailbox reader")?;
    let notifier = SlackWebhookNotifier::new(config.request_timeout)
        .context("Failed to create notifier")?;

    let reminder_run = ReminderRun::new(
        Arc::new(reader),
        Arc::new(notifier),
        Arc::new(config.policy),
        config.settings,
    );
    let summary = reminder_run.execute(Utc::now()).await?;

    println!("{}", summary.headline());
    for failure in &summary.fetch_failures {
        eprintln!(
            "   Fetch failed: {} ({})",
            failure.conversation_id, failure.reason
        );
    }
    for failure in &summary.delivery.failures {
        eprintln!(
            "   Delivery failed: {} ({})",
            failure.conversation_id, failure.reason
        );
    }
    for id in &summary.delivery.unresolved {
        eprintln!("   Delivery unresolved at deadline: {id}");
    }

    summary.ensure_complete()?;
    Ok(ExitCode::SUCCESS)
}

/// Log to stderr, and additionally to `$REMINDER_LOG_DIR/inbox-reminder.log`
/// when that variable is set.
fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = std::env::var_os("REMINDER_LOG_DIR")
        .map(PathBuf::from)
        .filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .map(|dir| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(tracing_appender::rolling::never(dir, "inbox-reminder.log"))
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}
