//! Per-channel cache of recently seen media posts. The Bot API has no
//! history endpoint, so the periodic scan reads from this cache, which is
//! fed by the live channel-post stream.

use std::collections::{HashMap, VecDeque};

use teloxide::types::ChatId;

use crate::types::SourceMessage;

pub struct RecentPosts {
    capacity: usize,
    per_channel: HashMap<ChatId, VecDeque<SourceMessage>>,
}

impl RecentPosts {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            per_channel: HashMap::new(),
        }
    }

    /// Append a post, dropping the oldest entries past the per-channel cap.
    /// Re-delivery of a message id already in the ring is ignored.
    pub fn record(&mut self, msg: SourceMessage) {
        let ring = self.per_channel.entry(msg.channel).or_default();
        if ring.iter().any(|seen| seen.id == msg.id) {
            return;
        }
        ring.push_back(msg);
        while ring.len() > self.capacity {
            ring.pop_front();
        }
    }

    /// The most recent `limit` posts of a channel, oldest first.
    pub fn latest(&self, channel: ChatId, limit: usize) -> Vec<SourceMessage> {
        match self.per_channel.get(&channel) {
            Some(ring) => {
                let skip = ring.len().saturating_sub(limit);
                ring.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaRef;
    use teloxide::types::{FileId, MessageId};

    fn make_post(channel: i64, id: i32) -> SourceMessage {
        SourceMessage {
            id: MessageId(id),
            channel: ChatId(channel),
            media: MediaRef::Photo(FileId(format!("file-{id}"))),
            caption: None,
            link: None,
            likes: None,
            comments: None,
        }
    }

    #[test]
    fn latest_returns_newest_posts_oldest_first() {
        let mut cache = RecentPosts::new(50);
        for id in 1..=5 {
            cache.record(make_post(-100, id));
        }

        let posts = cache.latest(ChatId(-100), 3);
        let ids: Vec<i32> = posts.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn ring_evicts_past_capacity() {
        let mut cache = RecentPosts::new(3);
        for id in 1..=5 {
            cache.record(make_post(-100, id));
        }

        let posts = cache.latest(ChatId(-100), 10);
        let ids: Vec<i32> = posts.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn redelivered_post_is_not_duplicated() {
        let mut cache = RecentPosts::new(10);
        cache.record(make_post(-100, 1));
        cache.record(make_post(-100, 1));

        assert_eq!(cache.latest(ChatId(-100), 10).len(), 1);
    }

    #[test]
    fn channels_are_independent() {
        let mut cache = RecentPosts::new(10);
        cache.record(make_post(-100, 1));
        cache.record(make_post(-200, 2));

        assert_eq!(cache.latest(ChatId(-100), 10).len(), 1);
        assert_eq!(cache.latest(ChatId(-200), 10).len(), 1);
        assert!(cache.latest(ChatId(-300), 10).is_empty());
    }
}
