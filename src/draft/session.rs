// Draft session state machine: fixed slots, budget arithmetic, confirm.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::roster::{LiveEvent, RosterEntry};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Validation failures for draft operations. None of these are fatal; the
/// app layer turns them into user-visible warnings and leaves state
/// untouched.
#[derive(Debug, Error, PartialEq)]
pub enum DraftError {
    #[error("{name} is already in your picks")]
    AlreadyPicked { name: String },

    #[error("cost {cost} exceeds remaining budget {remaining}")]
    BudgetExceeded { cost: u32, remaining: u32 },

    #[error("all slots are filled")]
    SlotsFull,

    #[error("player is not in any slot")]
    NotPicked,

    #[error("slot {slot} is empty")]
    EmptySlot { slot: usize },

    #[error("slot {slot} is out of range")]
    SlotOutOfRange { slot: usize },

    #[error("only {filled} of {total} slots are filled")]
    Incomplete { filled: usize, total: usize },

    #[error("picks locked at {lock_at}")]
    Locked { lock_at: DateTime<Utc> },
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One of the fixed draft positions. Created empty at session start and
/// never destroyed; filled and cleared by user action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftSlot {
    pub entry: Option<RosterEntry>,
}

/// A user's draft for one live event: a fixed number of slots, a budget
/// cap, and the active slot marking UI focus.
///
/// The budget is derived, never stored: `budget_remaining()` recomputes
/// `cap - sum(cost of filled slots)` on every call, so the invariant holds
/// at every step by construction. All invariants are re-checked against
/// current state at the moment of each mutating call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSession {
    slots: Vec<DraftSlot>,
    active_slot: usize,
    cap: u32,
    event: LiveEvent,
}

impl DraftSession {
    pub fn new(event: LiveEvent, cap: u32, slot_count: usize) -> Self {
        DraftSession {
            slots: (0..slot_count).map(|_| DraftSlot::default()).collect(),
            active_slot: 0,
            cap,
            event,
        }
    }

    pub fn event(&self) -> &LiveEvent {
        &self.event
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn slots(&self) -> &[DraftSlot] {
        &self.slots
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Index of the slot currently holding UI focus.
    pub fn active_slot(&self) -> usize {
        self.active_slot
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    /// Total cost of all filled slots.
    pub fn spent(&self) -> u32 {
        self.slots
            .iter()
            .filter_map(|s| s.entry.as_ref())
            .map(|e| e.cost)
            .sum()
    }

    /// Remaining budget, derived from the slots.
    pub fn budget_remaining(&self) -> u32 {
        self.cap.saturating_sub(self.spent())
    }

    /// Identities of all picked players, in slot order. Bounded by the slot
    /// count and free of duplicates by the `select` checks.
    pub fn pick_set(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter_map(|s| s.entry.as_ref())
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn contains(&self, entry_id: &str) -> bool {
        self.slots
            .iter()
            .any(|s| s.entry.as_ref().is_some_and(|e| e.id == entry_id))
    }

    /// Move UI focus to a slot.
    pub fn set_active_slot(&mut self, slot: usize) -> Result<(), DraftError> {
        if slot >= self.slots.len() {
            return Err(DraftError::SlotOutOfRange { slot });
        }
        self.active_slot = slot;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Place `entry` into the draft.
    ///
    /// Rejects duplicates, over-budget picks (checked before the slot is
    /// touched), and a full draft. On success the entry goes into the
    /// active slot if empty, otherwise the first empty slot in slot order;
    /// focus then advances to the next empty slot (wrapping), or stays put
    /// when the draft just became complete. Returns the filled slot index.
    pub fn select(&mut self, entry: RosterEntry) -> Result<usize, DraftError> {
        if self.contains(&entry.id) {
            return Err(DraftError::AlreadyPicked { name: entry.name });
        }

        let remaining = self.budget_remaining();
        if entry.cost > remaining {
            return Err(DraftError::BudgetExceeded {
                cost: entry.cost,
                remaining,
            });
        }

        let target = if self.slots[self.active_slot].entry.is_none() {
            self.active_slot
        } else {
            match self.slots.iter().position(|s| s.entry.is_none()) {
                Some(idx) => idx,
                None => return Err(DraftError::SlotsFull),
            }
        };

        debug!("placing {} into slot {}", entry.name, target);
        self.slots[target].entry = Some(entry);
        self.active_slot = self.next_empty_after(target).unwrap_or(target);
        Ok(target)
    }

    /// Clear the slot holding the player with `entry_id`, refund its cost,
    /// and focus the freed slot. Removing an absent player changes nothing
    /// and reports `NotPicked`.
    pub fn remove_entry(&mut self, entry_id: &str) -> Result<u32, DraftError> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.entry.as_ref().is_some_and(|e| e.id == entry_id))
            .ok_or(DraftError::NotPicked)?;
        self.clear_slot(slot)
    }

    /// Clear a slot by index, refund its cost, and focus it.
    pub fn clear_slot(&mut self, slot: usize) -> Result<u32, DraftError> {
        if slot >= self.slots.len() {
            return Err(DraftError::SlotOutOfRange { slot });
        }
        let entry = self.slots[slot]
            .entry
            .take()
            .ok_or(DraftError::EmptySlot { slot })?;
        self.active_slot = slot;
        debug!("cleared {} from slot {}", entry.name, slot);
        Ok(entry.cost)
    }

    /// Validate the draft for persistence at time `now`.
    ///
    /// Succeeds only when every slot is filled and the event has not
    /// locked, returning the pick set to write. Local state is never
    /// changed, so a rejected or failed confirm is safe to retry and a
    /// successful one keeps the picks visible.
    pub fn confirm(&self, now: DateTime<Utc>) -> Result<Vec<String>, DraftError> {
        let filled = self.filled_count();
        if filled < self.slots.len() {
            return Err(DraftError::Incomplete {
                filled,
                total: self.slots.len(),
            });
        }
        if now >= self.event.lock_at {
            return Err(DraftError::Locked {
                lock_at: self.event.lock_at,
            });
        }
        Ok(self.pick_set())
    }

    /// First empty slot strictly after `slot`, wrapping around.
    fn next_empty_after(&self, slot: usize) -> Option<usize> {
        let len = self.slots.len();
        (1..len)
            .map(|offset| (slot + offset) % len)
            .find(|&idx| self.slots[idx].entry.is_none())
    }
}
