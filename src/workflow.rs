//! Orchestration of the moderation pipeline: live posts and scan hits go to
//! the moderation chat, approval clicks publish to the target channel.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use teloxide::types::{ChatId, MessageId};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::CurationConfig;
use crate::engagement::is_popular;
use crate::moderation::{ModerationQueue, PublishedSet};
use crate::selector::ChannelSelector;
use crate::types::SourceMessage;

/// Platform operations the workflow depends on. The live implementation
/// wraps the Telegram bot (`bot.rs`); tests substitute a mock.
#[async_trait]
pub trait ChannelClient: Send + Sync {
    /// Subscriber count of a source channel.
    async fn subscriber_count(&self, channel: ChatId) -> Result<u32>;

    /// Up to `limit` recent media posts of a source channel.
    async fn recent_media(&self, channel: ChatId, limit: usize) -> Result<Vec<SourceMessage>>;

    /// Post a candidate into the moderation chat with an Approve button and
    /// return the id of the posted message.
    async fn post_candidate(&self, msg: &SourceMessage) -> Result<MessageId>;

    /// Send the original media, with its original caption, to the target
    /// channel.
    async fn publish(&self, msg: &SourceMessage) -> Result<()>;

    /// Swap the moderation message's caption to its approved form, dropping
    /// the button.
    async fn mark_approved(&self, moderation_id: MessageId) -> Result<()>;
}

/// Result of an approval click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Published,
    /// The platform rejected the send; the entry is consumed and nothing is
    /// retried.
    PublishFailed,
    /// Unknown or already-resolved moderation entry.
    NotFound,
}

pub struct Workflow {
    client: Arc<dyn ChannelClient>,
    min_engagement_percentage: f64,
    scan_fetch_limit: usize,
    published: Mutex<PublishedSet>,
    queue: Mutex<ModerationQueue>,
    selector: Mutex<ChannelSelector>,
}

impl Workflow {
    pub fn new(
        client: Arc<dyn ChannelClient>,
        sources: Vec<ChatId>,
        curation: &CurationConfig,
    ) -> Self {
        Self {
            client,
            min_engagement_percentage: curation.min_engagement_percentage,
            scan_fetch_limit: curation.scan_fetch_limit,
            published: Mutex::new(PublishedSet::new()),
            queue: Mutex::new(ModerationQueue::new()),
            selector: Mutex::new(ChannelSelector::new(
                sources,
                curation.channel_cooldown_hours,
            )),
        }
    }

    /// Live path: a fresh photo/animation post from a source channel goes
    /// straight to moderation, gated only by the dedup set.
    pub async fn handle_incoming(&self, msg: SourceMessage) -> Result<()> {
        let id = msg.source_id();
        if self.submit(msg).await? {
            info!(
                "Live post {} from channel {} sent to moderation",
                id.message.0, id.channel.0
            );
        }
        Ok(())
    }

    /// Periodic path: pick one channel out of cooldown and queue its popular
    /// recent posts. Failures abandon the cycle, nothing is retried.
    pub async fn run_scan(&self) {
        let channel = { self.selector.lock().await.select(Utc::now()) };
        let Some(channel) = channel else {
            info!("All source channels are cooling down, skipping scan");
            return;
        };

        let posts = match self.client.recent_media(channel, self.scan_fetch_limit).await {
            Ok(posts) => posts,
            Err(e) => {
                warn!(
                    "Failed to fetch recent posts from channel {}: {:#}",
                    channel.0, e
                );
                return;
            }
        };
        if posts.is_empty() {
            info!("No recent media in channel {}", channel.0);
            return;
        }

        let subscribers = match self.client.subscriber_count(channel).await {
            Ok(count) => count,
            Err(e) => {
                // Substitute 1 so the ratio stays defined; is_popular still
                // short-circuits a genuine zero.
                warn!(
                    "Failed to fetch subscriber count for channel {}: {:#}",
                    channel.0, e
                );
                1
            }
        };

        let mut queued = 0usize;
        for msg in posts {
            let likes = msg.likes.unwrap_or(0);
            let comments = msg.comments.unwrap_or(0);
            if !is_popular(likes, comments, subscribers, self.min_engagement_percentage) {
                continue;
            }
            match self.submit(msg).await {
                Ok(true) => queued += 1,
                Ok(false) => {}
                Err(e) => warn!("Failed to queue scanned post: {:#}", e),
            }
        }
        info!(
            "Scan of channel {} queued {} post(s) for moderation",
            channel.0, queued
        );
    }

    /// Approval click on a moderation message.
    pub async fn handle_approval(&self, moderation_id: MessageId) -> ApprovalOutcome {
        let original = { self.queue.lock().await.resolve_and_remove(moderation_id) };
        let Some(original) = original else {
            warn!(
                "No pending moderation entry for message {}",
                moderation_id.0
            );
            return ApprovalOutcome::NotFound;
        };

        if let Err(e) = self.client.publish(&original).await {
            error!(
                "Failed to publish approved post {}: {:#}",
                original.id.0, e
            );
            return ApprovalOutcome::PublishFailed;
        }
        info!(
            "Post {} from channel {} published",
            original.id.0, original.channel.0
        );

        if let Err(e) = self.client.mark_approved(moderation_id).await {
            warn!(
                "Failed to update moderation message {}: {:#}",
                moderation_id.0, e
            );
        }
        ApprovalOutcome::Published
    }

    /// Dedup-guarded hand-off to moderation. The published-set lock is held
    /// across the candidate post so the check-then-mark pair is atomic.
    async fn submit(&self, msg: SourceMessage) -> Result<bool> {
        let id = msg.source_id();
        let mut published = self.published.lock().await;
        if published.contains(&id) {
            return Ok(false);
        }
        let moderation_id = self.client.post_candidate(&msg).await?;
        published.mark(id);
        drop(published);

        self.queue.lock().await.insert(moderation_id, msg);
        Ok(true)
    }
}
