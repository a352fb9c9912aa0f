// Live event resolution and roster loading.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::gateway::{Document, DocumentGateway, GatewayError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RosterError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// No event is flagged live. The "exactly one live event" convention is
    /// enforced here rather than assumed.
    #[error("no live event found")]
    NoLiveEvent,

    #[error("{count} events are flagged live; expected exactly one")]
    MultipleLiveEvents { count: usize },

    #[error("event `{id}` has a missing or invalid lock timestamp")]
    InvalidLockTime { id: String },
}

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// The currently active event: picks are drafted against its roster and
/// rejected once its lock time passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub id: String,
    pub name: String,
    pub lock_at: DateTime<Utc>,
}

/// One selectable player record for an event. Immutable once loaded; a
/// reload replaces the whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    pub team: String,
    pub rank: u32,
    pub cost: u32,
    /// Secondary identifier used to look up a display picture, when present.
    pub picture: Option<String>,
}

/// The loaded roster plus the derived set of distinct team names.
#[derive(Debug, Clone, Default)]
pub struct EventRoster {
    pub entries: Vec<RosterEntry>,
    /// Distinct team names, sorted.
    pub teams: Vec<String>,
}

// ---------------------------------------------------------------------------
// Live event resolution
// ---------------------------------------------------------------------------

/// Resolve the single live event from the `events` collection.
///
/// Zero or multiple live-flagged events are error states surfaced to the
/// caller, never silently reduced to a first match.
pub async fn resolve_live_event(
    gateway: &dyn DocumentGateway,
) -> Result<LiveEvent, RosterError> {
    let documents = gateway.list_documents("events").await?;

    let live: Vec<&Document> = documents
        .iter()
        .filter(|d| d.fields.get("live").and_then(|v| v.as_bool()) == Some(true))
        .collect();

    let doc = match live.as_slice() {
        [] => return Err(RosterError::NoLiveEvent),
        [one] => *one,
        many => {
            return Err(RosterError::MultipleLiveEvents { count: many.len() });
        }
    };

    let lock_at = doc
        .fields
        .get("lock_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| RosterError::InvalidLockTime { id: doc.id.clone() })?;

    Ok(LiveEvent {
        id: doc.id.clone(),
        name: doc.str_field("name"),
        lock_at,
    })
}

// ---------------------------------------------------------------------------
// Roster loading
// ---------------------------------------------------------------------------

/// Collection path holding an event's player documents.
pub fn players_collection(event_id: &str) -> String {
    format!("events/{event_id}/players")
}

/// Fetch and normalize the player list for an event.
///
/// Normalization is permissive: missing numeric fields become 0, missing
/// strings become empty, and a missing player id falls back to the document
/// id. Malformed documents are kept (degraded) rather than dropped so the
/// list length always matches the backend.
pub async fn load_roster(
    gateway: &dyn DocumentGateway,
    event_id: &str,
) -> Result<EventRoster, RosterError> {
    let documents = gateway.list_documents(&players_collection(event_id)).await?;
    debug!("loaded {} roster documents for event {}", documents.len(), event_id);

    let entries: Vec<RosterEntry> = documents.iter().map(normalize_entry).collect();

    let teams: BTreeSet<String> = entries
        .iter()
        .filter(|e| !e.team.is_empty())
        .map(|e| e.team.clone())
        .collect();

    Ok(EventRoster {
        entries,
        teams: teams.into_iter().collect(),
    })
}

fn normalize_entry(doc: &Document) -> RosterEntry {
    let mut id = doc.str_field("id");
    if id.is_empty() {
        // Some player documents carry a numeric id.
        let numeric = doc.u64_field("id");
        id = if numeric > 0 {
            numeric.to_string()
        } else {
            doc.id.clone()
        };
    }

    let name = doc.str_field("name");
    if name.is_empty() {
        warn!("roster document {} has no name field", doc.id);
    }

    let picture = doc
        .fields
        .get("picture")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    RosterEntry {
        id,
        name,
        team: doc.str_field("team"),
        rank: doc.u64_field("rank") as u32,
        cost: doc.u64_field("cost") as u32,
        picture,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use serde_json::json;

    fn seed_event(gateway: &MemoryGateway, id: &str, live: bool, lock_at: &str) {
        gateway.seed_document(
            "events",
            id,
            json!({"name": format!("Event {id}"), "live": live, "lock_at": lock_at}),
        );
    }

    // ------------------------------------------------------------------
    // Live event resolution
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn resolves_single_live_event() {
        let gateway = MemoryGateway::new();
        seed_event(&gateway, "ev1", false, "2026-08-01T12:00:00Z");
        seed_event(&gateway, "ev2", true, "2026-09-01T12:00:00Z");

        let event = resolve_live_event(&gateway).await.unwrap();
        assert_eq!(event.id, "ev2");
        assert_eq!(event.name, "Event ev2");
        assert_eq!(
            event.lock_at,
            DateTime::parse_from_rfc3339("2026-09-01T12:00:00Z").unwrap()
        );
    }

    #[tokio::test]
    async fn zero_live_events_is_an_error() {
        let gateway = MemoryGateway::new();
        seed_event(&gateway, "ev1", false, "2026-08-01T12:00:00Z");

        let err = resolve_live_event(&gateway).await.unwrap_err();
        assert!(matches!(err, RosterError::NoLiveEvent));
    }

    #[tokio::test]
    async fn multiple_live_events_is_an_error() {
        let gateway = MemoryGateway::new();
        seed_event(&gateway, "ev1", true, "2026-08-01T12:00:00Z");
        seed_event(&gateway, "ev2", true, "2026-09-01T12:00:00Z");

        let err = resolve_live_event(&gateway).await.unwrap_err();
        match err {
            RosterError::MultipleLiveEvents { count } => assert_eq!(count, 2),
            other => panic!("expected MultipleLiveEvents, got: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_lock_timestamp_is_an_error() {
        let gateway = MemoryGateway::new();
        gateway.seed_document("events", "ev1", json!({"name": "Broken", "live": true}));

        let err = resolve_live_event(&gateway).await.unwrap_err();
        match err {
            RosterError::InvalidLockTime { id } => assert_eq!(id, "ev1"),
            other => panic!("expected InvalidLockTime, got: {other}"),
        }
    }

    // ------------------------------------------------------------------
    // Roster loading / normalization
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn loads_and_normalizes_roster() {
        let gateway = MemoryGateway::new();
        let collection = players_collection("ev1");
        gateway.seed_document(
            &collection,
            "p1",
            json!({
                "id": "77",
                "name": "Maya Cross",
                "team": "Red Vipers",
                "rank": 3,
                "cost": 250000,
                "picture": "77"
            }),
        );
        // Degenerate document: everything missing
        gateway.seed_document(&collection, "p2", json!({}));
        // Numeric id, no picture
        gateway.seed_document(
            &collection,
            "p3",
            json!({"id": 42, "name": "Kit Halloway", "team": "Blue Hornets", "cost": 400000}),
        );

        let roster = load_roster(&gateway, "ev1").await.unwrap();
        assert_eq!(roster.entries.len(), 3);

        let maya = &roster.entries[0];
        assert_eq!(maya.id, "77");
        assert_eq!(maya.name, "Maya Cross");
        assert_eq!(maya.cost, 250_000);
        assert_eq!(maya.rank, 3);
        assert_eq!(maya.picture.as_deref(), Some("77"));

        // Permissive defaults: id falls back to document id
        let blank = &roster.entries[1];
        assert_eq!(blank.id, "p2");
        assert_eq!(blank.name, "");
        assert_eq!(blank.team, "");
        assert_eq!(blank.cost, 0);
        assert_eq!(blank.rank, 0);
        assert!(blank.picture.is_none());

        let kit = &roster.entries[2];
        assert_eq!(kit.id, "42");
        assert!(kit.picture.is_none());
    }

    #[tokio::test]
    async fn derives_distinct_sorted_teams() {
        let gateway = MemoryGateway::new();
        let collection = players_collection("ev1");
        for (doc_id, team) in [
            ("p1", "Red Vipers"),
            ("p2", "Blue Hornets"),
            ("p3", "Red Vipers"),
            ("p4", ""),
        ] {
            gateway.seed_document(
                &collection,
                doc_id,
                json!({"name": doc_id, "team": team, "cost": 1}),
            );
        }

        let roster = load_roster(&gateway, "ev1").await.unwrap();
        assert_eq!(roster.teams, vec!["Blue Hornets", "Red Vipers"]);
    }

    #[tokio::test]
    async fn empty_event_roster_is_ok() {
        let gateway = MemoryGateway::new();
        let roster = load_roster(&gateway, "ev_empty").await.unwrap();
        assert!(roster.entries.is_empty());
        assert!(roster.teams.is_empty());
    }
}
