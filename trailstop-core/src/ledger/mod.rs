//! Performance ledger reconstruction.
//!
//! Turns the discrete trade log back into a continuous daily series of
//! cash, per-asset holdings, equity, returns and drawdowns.

pub mod events;
pub mod reconstruct;

pub use events::{aggregate, expand_events, EventBucket, LedgerEvent};
pub use reconstruct::reconstruct_daily;
