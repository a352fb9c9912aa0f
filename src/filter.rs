// Pure filter/sort engine over the roster.
//
// Idempotent and side-effect free, so the app loop can recompute the
// visible list on every keystroke.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::roster::RosterEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    Name,
    Team,
    Cost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Filter and sort parameters for the roster view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterFilter {
    pub query: String,
    /// Inclusive cost range.
    pub cost_range: (u32, u32),
    /// Teams to include; empty means no team filtering.
    pub teams: HashSet<String>,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

impl Default for RosterFilter {
    fn default() -> Self {
        RosterFilter {
            query: String::new(),
            cost_range: (0, u32::MAX),
            teams: HashSet::new(),
            sort_field: SortField::Cost,
            sort_direction: SortDirection::Descending,
        }
    }
}

/// Derive the visible, ordered subset of `roster` under `filter`.
///
/// The output preserves input order for sort ties (stable sort), so
/// identical inputs always produce the identical list.
pub fn apply(roster: &[RosterEntry], filter: &RosterFilter) -> Vec<RosterEntry> {
    let query = collapse(&filter.query);
    let (min_cost, max_cost) = filter.cost_range;

    let mut visible: Vec<RosterEntry> = roster
        .iter()
        .filter(|entry| entry.cost >= min_cost && entry.cost <= max_cost)
        .filter(|entry| filter.teams.is_empty() || filter.teams.contains(&entry.team))
        .filter(|entry| matches_query(entry, &query))
        .cloned()
        .collect();

    visible.sort_by(|a, b| {
        let ordering = match filter.sort_field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Team => a.team.to_lowercase().cmp(&b.team.to_lowercase()),
            SortField::Cost => a.cost.cmp(&b.cost),
        };
        match filter.sort_direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });

    visible
}

/// Lowercase and collapse runs of whitespace to single spaces.
fn collapse(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Case-insensitive, whitespace-collapsed substring match against name and
/// team, falling back to per-word prefix matching for queries longer than
/// three characters ("van d" still finds "Virgil van Dijk").
fn matches_query(entry: &RosterEntry, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }

    let name = collapse(&entry.name);
    let team = collapse(&entry.team);
    if name.contains(query) || team.contains(query) {
        return true;
    }

    if query.chars().count() <= 3 {
        return false;
    }

    // Every query word must prefix some word of the name or team.
    let haystack_words: Vec<&str> = name.split(' ').chain(team.split(' ')).collect();
    query
        .split(' ')
        .all(|qw| haystack_words.iter().any(|hw| hw.starts_with(qw)))
}
