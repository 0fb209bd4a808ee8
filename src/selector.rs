//! Cooldown-aware choice of which source channel the periodic scan visits.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::seq::IndexedRandom;
use teloxide::types::ChatId;
use tracing::debug;

pub struct ChannelSelector {
    channels: Vec<ChatId>,
    cooldown: Duration,
    last_selected: HashMap<ChatId, DateTime<Utc>>,
}

impl ChannelSelector {
    pub fn new(channels: Vec<ChatId>, cooldown_hours: i64) -> Self {
        Self {
            channels,
            cooldown: Duration::hours(cooldown_hours),
            last_selected: HashMap::new(),
        }
    }

    /// Uniformly random pick among channels whose last selection is absent or
    /// older than the cooldown. Stamps the chosen channel with `now`; returns
    /// `None` and changes nothing when every channel is still cooling down.
    pub fn select(&mut self, now: DateTime<Utc>) -> Option<ChatId> {
        let eligible: Vec<ChatId> = self
            .channels
            .iter()
            .copied()
            .filter(|channel| {
                self.last_selected
                    .get(channel)
                    .map_or(true, |last| now - *last > self.cooldown)
            })
            .collect();

        let chosen = *eligible.choose(&mut rand::rng())?;
        self.last_selected.insert(chosen, now);
        debug!(
            "Selected channel {} ({} of {} eligible)",
            chosen.0,
            eligible.len(),
            self.channels.len()
        );
        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_selector_picks_from_configured_channels() {
        let channels = vec![ChatId(-1), ChatId(-2), ChatId(-3)];
        let mut selector = ChannelSelector::new(channels.clone(), 6);

        let chosen = selector.select(Utc::now()).unwrap();
        assert!(channels.contains(&chosen));
    }

    #[test]
    fn channel_within_cooldown_is_not_reselected() {
        let mut selector = ChannelSelector::new(vec![ChatId(-1)], 6);
        let now = Utc::now();

        assert_eq!(selector.select(now), Some(ChatId(-1)));
        assert_eq!(selector.select(now), None);
        assert_eq!(selector.select(now + Duration::hours(5)), None);
    }

    #[test]
    fn channel_becomes_eligible_after_cooldown() {
        let mut selector = ChannelSelector::new(vec![ChatId(-1)], 6);
        let now = Utc::now();

        selector.select(now).unwrap();
        let later = now + Duration::hours(6) + Duration::seconds(1);
        assert_eq!(selector.select(later), Some(ChatId(-1)));
    }

    #[test]
    fn exhausted_pool_leaves_state_unchanged() {
        let mut selector = ChannelSelector::new(vec![ChatId(-1)], 6);
        let now = Utc::now();
        selector.select(now).unwrap();

        // A failed selection must not refresh the stamp, so the channel still
        // comes back exactly when the original cooldown expires.
        assert_eq!(selector.select(now + Duration::hours(3)), None);
        let after_cooldown = now + Duration::hours(6) + Duration::seconds(1);
        assert_eq!(selector.select(after_cooldown), Some(ChatId(-1)));
    }

    #[test]
    fn both_channels_selectable_within_one_window() {
        let mut selector = ChannelSelector::new(vec![ChatId(-1), ChatId(-2)], 6);
        let now = Utc::now();

        let first = selector.select(now).unwrap();
        let second = selector.select(now).unwrap();
        assert_ne!(first, second);
        assert_eq!(selector.select(now), None);
    }

    #[test]
    fn zero_cooldown_always_selects() {
        let mut selector = ChannelSelector::new(vec![ChatId(-1)], 0);
        let now = Utc::now();

        assert!(selector.select(now).is_some());
        assert!(selector.select(now + Duration::seconds(1)).is_some());
    }
}
