// Pick'em assistant entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Connect the document gateway
// 4. Resolve the live event and load its roster
// 5. Create mpsc channels
// 6. Build AppState and spawn the event loop task
// 7. Wait for Ctrl+C, then shut down

use std::sync::Arc;

use paintball_pickem::app;
use paintball_pickem::config;
use paintball_pickem::gateway::HttpGateway;
use paintball_pickem::images::ImageResolver;
use paintball_pickem::roster;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Pick'em assistant starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} slots, {} budget cap, gateway {}",
        config.draft.slot_count, config.draft.budget_cap, config.gateway.base_url
    );

    // 3. Connect the document gateway
    let gateway = Arc::new(
        HttpGateway::from_config(&config.gateway).context("failed to build gateway client")?,
    );

    // 4. Resolve the live event and load its roster
    let event = roster::resolve_live_event(gateway.as_ref())
        .await
        .context("failed to resolve live event")?;
    info!("Live event: {} ({}), locks at {}", event.name, event.id, event.lock_at);

    let event_roster = roster::load_roster(gateway.as_ref(), &event.id)
        .await
        .context("failed to load event roster")?;
    info!(
        "Loaded {} players across {} teams",
        event_roster.entries.len(),
        event_roster.teams.len()
    );

    let resolver = Arc::new(ImageResolver::new(
        gateway.clone(),
        &config.storage.picture_prefix,
        &config.storage.placeholder_url,
    ));

    // 5. Create mpsc channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (image_tx, image_rx) = mpsc::channel(64);
    let (ui_tx, mut ui_rx) = mpsc::channel(256);

    // 6. Build AppState and spawn the event loop task
    let app_state = app::AppState::new(
        config,
        gateway,
        resolver,
        event,
        event_roster,
        image_tx,
        ui_tx,
    );

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, image_rx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // Surface notices in the log until a front end consumes them.
    let notice_handle = tokio::spawn(async move {
        while let Some(notice) = ui_rx.recv().await {
            match notice {
                app::Notice::Info(msg) => info!("{}", msg),
                app::Notice::Warning(msg) => tracing::warn!("{}", msg),
                app::Notice::Error(msg) => error!("{}", msg),
            }
        }
    });

    // 7. Wait for Ctrl+C, then shut down
    info!("Application ready");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    let _ = cmd_tx.send(app::Command::Shutdown).await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;
    notice_handle.abort();

    info!("Pick'em assistant shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (keeps the terminal free for a front end).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("pickem.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("paintball_pickem=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
