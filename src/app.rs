// Application state and orchestration logic.
//
// The central event loop that coordinates user commands, roster reloads,
// and picture resolution batches. All state transitions for one session
// happen here, one event at a time; invariants are re-checked synchronously
// at the moment of each mutating call, and last-applied-wins.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::draft::DraftSession;
use crate::filter::{self, RosterFilter};
use crate::gateway::DocumentGateway;
use crate::images::{ImageBatch, ImageResolver};
use crate::leaderboard;
use crate::roster::{self, EventRoster, LiveEvent, RosterEntry};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// User-initiated commands consumed by the event loop.
#[derive(Debug, Clone)]
pub enum Command {
    Select(RosterEntry),
    RemoveEntry(String),
    ClearSlot(usize),
    FocusSlot(usize),
    SetFilter(RosterFilter),
    Confirm,
    ReloadRoster,
    Standings,
    Shutdown,
}

/// User-visible notifications. Every failure in the system degrades to one
/// of these plus unchanged local state; nothing here is fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(String),
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state for one browsing session.
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<dyn DocumentGateway>,
    /// Picture resolver; shared with spawned lookup tasks.
    pub resolver: Arc<ImageResolver>,
    pub event: LiveEvent,
    pub session: DraftSession,
    pub roster: EventRoster,
    pub filter: RosterFilter,
    /// Derived view of the roster under the current filter. Recomputed
    /// wholesale on every roster or filter change.
    pub visible: Vec<RosterEntry>,
    /// Resolved picture URLs by roster entry id.
    pub pictures: HashMap<String, String>,
    /// Sender handed to picture lookup tasks.
    image_tx: mpsc::Sender<ImageBatch>,
    ui_tx: mpsc::Sender<Notice>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        gateway: Arc<dyn DocumentGateway>,
        resolver: Arc<ImageResolver>,
        event: LiveEvent,
        roster: EventRoster,
        image_tx: mpsc::Sender<ImageBatch>,
        ui_tx: mpsc::Sender<Notice>,
    ) -> Self {
        let session = DraftSession::new(
            event.clone(),
            config.draft.budget_cap,
            config.draft.slot_count,
        );
        let filter = RosterFilter::default();
        let visible = filter::apply(&roster.entries, &filter);

        AppState {
            config,
            gateway,
            resolver,
            event,
            session,
            roster,
            filter,
            visible,
            pictures: HashMap::new(),
            image_tx,
            ui_tx,
        }
    }

    async fn notify(&self, notice: Notice) {
        // The UI side may have gone away during shutdown; dropping the
        // notice is fine then.
        let _ = self.ui_tx.send(notice).await;
    }

    /// Recompute the visible list and kick off picture resolution for it
    /// under a fresh generation, superseding any in-flight batch.
    fn refresh_view(&mut self) {
        self.visible = filter::apply(&self.roster.entries, &self.filter);

        let generation = self.resolver.next_generation();
        let lookups: Vec<(String, String)> = self
            .visible
            .iter()
            .filter_map(|e| e.picture.clone().map(|p| (e.id.clone(), p)))
            .collect();
        if lookups.is_empty() {
            return;
        }

        let resolver = Arc::clone(&self.resolver);
        let image_tx = self.image_tx.clone();
        tokio::spawn(async move {
            let batch = resolver.resolve_batch(generation, &lookups).await;
            let _ = image_tx.send(batch).await;
        });
    }

    /// Apply a resolved picture batch, unless a newer generation has
    /// superseded it.
    pub fn apply_image_batch(&mut self, batch: ImageBatch) {
        if !self.resolver.is_current(batch.generation) {
            debug!(
                "discarding stale picture batch (generation {} < {})",
                batch.generation,
                self.resolver.current_generation()
            );
            return;
        }
        for (entry_id, url) in batch.urls {
            self.pictures.insert(entry_id, url);
        }
    }

    /// Handle one command. Returns `false` when the loop should stop.
    pub async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Select(entry) => {
                let name = entry.name.clone();
                match self.session.select(entry) {
                    Ok(slot) => {
                        info!("picked {} into slot {}", name, slot);
                        self.notify(Notice::Info(format!(
                            "{} added to slot {} ({} remaining)",
                            name,
                            slot + 1,
                            self.session.budget_remaining()
                        )))
                        .await;
                    }
                    Err(e) => {
                        warn!("selection rejected: {}", e);
                        self.notify(Notice::Warning(e.to_string())).await;
                    }
                }
            }
            Command::RemoveEntry(entry_id) => match self.session.remove_entry(&entry_id) {
                Ok(refund) => {
                    self.notify(Notice::Info(format!(
                        "pick removed, {refund} returned to budget"
                    )))
                    .await;
                }
                Err(e) => {
                    self.notify(Notice::Warning(e.to_string())).await;
                }
            },
            Command::ClearSlot(slot) => match self.session.clear_slot(slot) {
                Ok(refund) => {
                    self.notify(Notice::Info(format!(
                        "slot {} cleared, {refund} returned to budget",
                        slot + 1
                    )))
                    .await;
                }
                Err(e) => {
                    self.notify(Notice::Warning(e.to_string())).await;
                }
            },
            Command::FocusSlot(slot) => {
                if let Err(e) = self.session.set_active_slot(slot) {
                    self.notify(Notice::Warning(e.to_string())).await;
                }
            }
            Command::SetFilter(new_filter) => {
                self.filter = new_filter;
                self.refresh_view();
            }
            Command::Confirm => self.confirm().await,
            Command::ReloadRoster => self.reload_roster().await,
            Command::Standings => self.standings().await,
            Command::Shutdown => {
                info!("shutdown requested");
                return false;
            }
        }
        true
    }

    /// Validate and persist the pick set.
    ///
    /// The write is a single merge-update of the user document, scoped to
    /// the live event id. Last-writer-wins: no conflict detection against
    /// the remote copy. A failed write leaves local picks intact and is
    /// safe to retry; a successful one does not clear them.
    async fn confirm(&mut self) {
        let picks = match self.session.confirm(Utc::now()) {
            Ok(picks) => picks,
            Err(e) => {
                warn!("confirm rejected: {}", e);
                self.notify(Notice::Warning(e.to_string())).await;
                return;
            }
        };

        let fields = serde_json::json!({"pickems": {(self.event.id.clone()): picks}});
        match self
            .gateway
            .merge_update("users", &self.config.user_id, &fields)
            .await
        {
            Ok(()) => {
                info!("pick list saved for event {}", self.event.id);
                self.notify(Notice::Info("picks saved".to_string())).await;
            }
            Err(e) => {
                warn!("failed to save picks: {}", e);
                self.notify(Notice::Error(format!("failed to save picks: {e}")))
                    .await;
            }
        }
    }

    /// Replace the roster wholesale from the backend. On failure the
    /// previous roster stays in place.
    async fn reload_roster(&mut self) {
        match roster::load_roster(self.gateway.as_ref(), &self.event.id).await {
            Ok(new_roster) => {
                info!(
                    "roster reloaded: {} players, {} teams",
                    new_roster.entries.len(),
                    new_roster.teams.len()
                );
                self.roster = new_roster;
                self.refresh_view();
            }
            Err(e) => {
                warn!("roster reload failed, keeping previous list: {}", e);
                self.notify(Notice::Warning(format!("failed to refresh players: {e}")))
                    .await;
            }
        }
    }

    async fn standings(&self) {
        match leaderboard::compute_standings(self.gateway.as_ref(), &self.event.id).await {
            Ok(rows) => {
                let summary = rows
                    .iter()
                    .take(10)
                    .enumerate()
                    .map(|(i, r)| format!("{}. {} ({})", i + 1, r.name, r.total))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.notify(Notice::Info(format!("standings: {summary}"))).await;
            }
            Err(e) => {
                warn!("standings computation failed: {}", e);
                self.notify(Notice::Warning(format!("failed to load standings: {e}")))
                    .await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the event loop until `Shutdown` arrives or the command channel
/// closes. Picture batches interleave with commands; both are processed
/// one at a time on this task, so no two state mutations race.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<Command>,
    mut image_rx: mpsc::Receiver<ImageBatch>,
    mut state: AppState,
) -> anyhow::Result<()> {
    // Initial view already derived in AppState::new; start picture lookups.
    state.refresh_view();

    loop {
        tokio::select! {
            command = cmd_rx.recv() => {
                match command {
                    Some(command) => {
                        if !state.handle_command(command).await {
                            break;
                        }
                    }
                    None => {
                        debug!("command channel closed");
                        break;
                    }
                }
            }
            Some(batch) = image_rx.recv() => {
                state.apply_image_batch(batch);
            }
        }
    }

    info!("event loop stopped");
    Ok(())
}
