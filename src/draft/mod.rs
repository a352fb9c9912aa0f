// Draft session: slots, budget, and pick confirmation.

pub mod session;

pub use session::{DraftError, DraftSession, DraftSlot};
