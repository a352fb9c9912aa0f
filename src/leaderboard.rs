// Standings computed over confirmed pick lists.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gateway::{DocumentGateway, GatewayError};

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub user_id: String,
    pub name: String,
    /// Sum of the user's picked players' points for the event.
    pub total: u64,
}

/// Collection path holding an event's per-player scores.
pub fn scores_collection(event_id: &str) -> String {
    format!("events/{event_id}/scores")
}

/// Compute standings for an event.
///
/// Reads every user's `pickems.{event_id}` array and the event's score
/// documents (player id -> points), sums each user's picked players'
/// points, and ranks by total descending with ties broken by display name.
/// Users without a pick list for the event are skipped; picks with no
/// score document count zero.
pub async fn compute_standings(
    gateway: &dyn DocumentGateway,
    event_id: &str,
) -> Result<Vec<StandingRow>, GatewayError> {
    let score_docs = gateway.list_documents(&scores_collection(event_id)).await?;
    let points: HashMap<String, u64> = score_docs
        .iter()
        .map(|d| (d.id.clone(), d.u64_field("points")))
        .collect();

    let users = gateway.list_documents("users").await?;
    debug!(
        "scoring {} users against {} score documents for event {}",
        users.len(),
        points.len(),
        event_id
    );

    let mut rows: Vec<StandingRow> = users
        .iter()
        .filter_map(|user| {
            let picks = user
                .fields
                .get("pickems")
                .and_then(|p| p.get(event_id))
                .and_then(|v| v.as_array())?;

            let total = picks
                .iter()
                .filter_map(|id| id.as_str())
                .map(|id| points.get(id).copied().unwrap_or(0))
                .sum();

            Some(StandingRow {
                user_id: user.id.clone(),
                name: user.str_field("name"),
                total,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

    Ok(rows)
}
