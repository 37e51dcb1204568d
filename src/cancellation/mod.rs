//! Period cancellation: the weekly/permanent state machine, its JSON
//! persistence, and the lookup the aggregator consults.
//!
//! [`CancellationBook`] holds per-period state plus a ledger of suppressed sessions.
//! [`JsonFileStore`] loads and saves a book on disk.
//! [`CancellationLookup`] is the read-only view the aggregator needs.

mod book;
mod store;

pub use book::{CancellationBook, PeriodStatus, TransitionError};
pub use store::JsonFileStore;

use std::collections::{BTreeSet, HashSet};

use crate::model::SessionKey;

/// Answers whether a concrete session was administratively cancelled.
pub trait CancellationLookup {
    fn is_cancelled(&self, session: &SessionKey) -> bool;
}

/// Nothing is ever cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCancellations;

impl CancellationLookup for NoCancellations {
    fn is_cancelled(&self, _session: &SessionKey) -> bool {
        false
    }
}

impl CancellationLookup for BTreeSet<SessionKey> {
    fn is_cancelled(&self, session: &SessionKey) -> bool {
        self.contains(session)
    }
}

impl CancellationLookup for HashSet<SessionKey> {
    fn is_cancelled(&self, session: &SessionKey) -> bool {
        self.contains(session)
    }
}
