//! Popularity scoring for channel posts.

use std::collections::HashMap;

use tracing::debug;

use crate::types::SourceId;

/// `(likes + comments) / subscribers * 100`. Callers must guard against
/// `subscribers == 0` (see [`is_popular`]).
pub fn engagement_ratio(likes: u32, comments: u32, subscribers: u32) -> f64 {
    (likes + comments) as f64 / subscribers as f64 * 100.0
}

/// Whether a post clears the configured engagement threshold. A channel that
/// resolves to zero subscribers never produces a popular post.
pub fn is_popular(likes: u32, comments: u32, subscribers: u32, threshold: f64) -> bool {
    if subscribers == 0 {
        return false;
    }
    engagement_ratio(likes, comments, subscribers) >= threshold
}

/// Reaction totals per source post, fed by `message_reaction_count` updates.
/// The Bot API only reports anonymous totals for channel posts, which is all
/// the popularity heuristic needs.
#[derive(Debug, Default)]
pub struct EngagementTracker {
    reactions: HashMap<SourceId, u32>,
}

impl EngagementTracker {
    pub fn new() -> Self {
        Self {
            reactions: HashMap::new(),
        }
    }

    /// Record the current reaction total of a post. Updates overwrite, the
    /// platform always sends the full count.
    pub fn set_reaction_total(&mut self, id: SourceId, total: u32) {
        debug!(
            "Reaction total for message {} in channel {}: {}",
            id.message.0, id.channel.0, total
        );
        self.reactions.insert(id, total);
    }

    pub fn reaction_total(&self, id: &SourceId) -> Option<u32> {
        self.reactions.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::{ChatId, MessageId};

    fn source_id(channel: i64, message: i32) -> SourceId {
        SourceId {
            channel: ChatId(channel),
            message: MessageId(message),
        }
    }

    #[test]
    fn ratio_matches_worked_example() {
        // 1000 subscribers, 80 likes, 20 comments -> 10%
        let ratio = engagement_ratio(80, 20, 1000);
        assert!((ratio - 10.0).abs() < 1e-9);
    }

    #[test]
    fn popular_iff_threshold_at_or_below_ratio() {
        assert!(is_popular(80, 20, 1000, 10.0));
        assert!(is_popular(80, 20, 1000, 5.0));
        assert!(!is_popular(80, 20, 1000, 10.5));
    }

    #[test]
    fn zero_subscribers_is_never_popular() {
        assert!(!is_popular(1_000_000, 1_000_000, 0, 0.0));
    }

    #[test]
    fn missing_counters_count_as_zero() {
        // The workflow maps absent counters to zero before calling in.
        assert!(!is_popular(0, 0, 1000, 0.1));
        assert!(is_popular(0, 0, 1000, 0.0));
    }

    #[test]
    fn is_deterministic() {
        for _ in 0..10 {
            assert!(is_popular(50, 0, 1000, 5.0));
        }
    }

    #[test]
    fn tracker_overwrites_totals() {
        let mut tracker = EngagementTracker::new();
        let id = source_id(-100, 7);

        assert_eq!(tracker.reaction_total(&id), None);
        tracker.set_reaction_total(id, 3);
        tracker.set_reaction_total(id, 12);
        assert_eq!(tracker.reaction_total(&id), Some(12));
    }

    #[test]
    fn tracker_keys_by_channel_and_message() {
        let mut tracker = EngagementTracker::new();
        tracker.set_reaction_total(source_id(-100, 7), 5);

        assert_eq!(tracker.reaction_total(&source_id(-200, 7)), None);
    }
}
