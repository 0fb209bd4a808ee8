//! In-memory bookkeeping for the moderation hand-off: which source posts
//! were already queued, and which candidates are still awaiting a click.

use std::collections::{HashMap, HashSet};

use teloxide::types::MessageId;

use crate::types::{SourceId, SourceMessage};

/// Source posts that have already been sent to moderation. Marked right
/// after the candidate is first posted, not after approval, so a post can be
/// queued at most once per process lifetime. No eviction.
#[derive(Debug, Default)]
pub struct PublishedSet {
    seen: HashSet<SourceId>,
}

impl PublishedSet {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    pub fn contains(&self, id: &SourceId) -> bool {
        self.seen.contains(id)
    }

    pub fn mark(&mut self, id: SourceId) {
        self.seen.insert(id);
    }
}

/// Outstanding candidates, keyed by the id of the message posted into the
/// moderation chat. That key space belongs to a single chat, so entries from
/// different source channels cannot collide.
#[derive(Debug, Default)]
pub struct ModerationQueue {
    pending: HashMap<MessageId, SourceMessage>,
}

impl ModerationQueue {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    pub fn insert(&mut self, moderation_id: MessageId, original: SourceMessage) {
        self.pending.insert(moderation_id, original);
    }

    /// Atomic lookup-and-delete. Unknown or already-resolved ids return
    /// `None` and leave the map untouched, which makes duplicate approval
    /// clicks harmless.
    pub fn resolve_and_remove(&mut self, moderation_id: MessageId) -> Option<SourceMessage> {
        self.pending.remove(&moderation_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
