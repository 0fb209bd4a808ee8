use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId,
    MessageReactionCountUpdated,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engagement::EngagementTracker;
use crate::history::RecentPosts;
use crate::types::{MediaRef, SourceId, SourceMessage};
use crate::workflow::{ApprovalOutcome, ChannelClient, Workflow};

/// Live Telegram implementation of [`ChannelClient`], plus the caches that
/// stand in for the Bot API's missing history endpoint.
pub struct TelegramClient {
    bot: Bot,
    moderation_chat: ChatId,
    target_channel: ChatId,
    history: Mutex<RecentPosts>,
    engagement: Mutex<EngagementTracker>,
}

impl TelegramClient {
    pub fn new(bot: Bot, config: &Config) -> Self {
        Self {
            bot,
            moderation_chat: config.channels.moderation_id(),
            target_channel: config.channels.target_id(),
            history: Mutex::new(RecentPosts::new(config.curation.history_capacity)),
            engagement: Mutex::new(EngagementTracker::new()),
        }
    }

    async fn record_post(&self, msg: SourceMessage) {
        self.history.lock().await.record(msg);
    }

    async fn record_reaction_total(&self, id: SourceId, total: u32) {
        self.engagement.lock().await.set_reaction_total(id, total);
    }

    fn moderation_caption(msg: &SourceMessage) -> String {
        let caption = msg.caption.as_deref().unwrap_or("");
        match &msg.link {
            Some(link) => format!("{}\n\nSource: {}", caption, link),
            None => caption.to_owned(),
        }
    }
}

#[async_trait]
impl ChannelClient for TelegramClient {
    async fn subscriber_count(&self, channel: ChatId) -> Result<u32> {
        let count = self.bot.get_chat_member_count(channel).await?;
        Ok(count)
    }

    async fn recent_media(&self, channel: ChatId, limit: usize) -> Result<Vec<SourceMessage>> {
        let mut posts = self.history.lock().await.latest(channel, limit);
        let engagement = self.engagement.lock().await;
        for post in &mut posts {
            post.likes = engagement.reaction_total(&post.source_id());
        }
        Ok(posts)
    }

    async fn post_candidate(&self, msg: &SourceMessage) -> Result<MessageId> {
        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "Approve",
            format!("approve_{}", msg.id.0),
        )]]);
        let caption = Self::moderation_caption(msg);

        let sent = match &msg.media {
            MediaRef::Photo(file_id) => {
                self.bot
                    .send_photo(self.moderation_chat, InputFile::file_id(file_id.clone()))
                    .caption(caption)
                    .reply_markup(keyboard)
                    .await?
            }
            MediaRef::Animation(file_id) => {
                self.bot
                    .send_animation(self.moderation_chat, InputFile::file_id(file_id.clone()))
                    .caption(caption)
                    .reply_markup(keyboard)
                    .await?
            }
        };
        Ok(sent.id)
    }

    async fn publish(&self, msg: &SourceMessage) -> Result<()> {
        match &msg.media {
            MediaRef::Photo(file_id) => {
                let mut req = self
                    .bot
                    .send_photo(self.target_channel, InputFile::file_id(file_id.clone()));
                if let Some(caption) = &msg.caption {
                    req = req.caption(caption.clone());
                }
                req.await?;
            }
            MediaRef::Animation(file_id) => {
                let mut req = self
                    .bot
                    .send_animation(self.target_channel, InputFile::file_id(file_id.clone()));
                if let Some(caption) = &msg.caption {
                    req = req.caption(caption.clone());
                }
                req.await?;
            }
        }
        Ok(())
    }

    async fn mark_approved(&self, moderation_id: MessageId) -> Result<()> {
        // Replacing the caption without a reply_markup also drops the button.
        self.bot
            .edit_message_caption(self.moderation_chat, moderation_id)
            .caption("Approved and published.")
            .await?;
        Ok(())
    }
}

/// Shared application state
pub struct AppState {
    pub workflow: Workflow,
    pub client: Arc<TelegramClient>,
    sources: Vec<ChatId>,
}

impl AppState {
    pub fn new(config: &Config, bot: Bot) -> Self {
        let client = Arc::new(TelegramClient::new(bot, config));
        let sources = config.channels.source_ids();
        let workflow = Workflow::new(client.clone(), sources.clone(), &config.curation);
        Self {
            workflow,
            client,
            sources,
        }
    }
}

/// Start the Telegram dispatcher
pub async fn run(bot: Bot, state: Arc<AppState>) -> Result<()> {
    info!("Starting Telegram dispatcher...");

    let sources = state.sources.clone();
    let handler = dptree::entry()
        .branch(
            Update::filter_channel_post()
                .filter(move |msg: Message| sources.contains(&msg.chat.id))
                .endpoint(handle_channel_post),
        )
        .branch(Update::filter_message_reaction_count_updated().endpoint(handle_reaction_count))
        .branch(
            Update::filter_callback_query()
                .filter(|q: CallbackQuery| {
                    q.data.as_deref().is_some_and(|data| data.starts_with("approve_"))
                })
                .endpoint(handle_approval),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("memebot"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_channel_post(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(post) = SourceMessage::from_telegram(&msg) else {
        return Ok(());
    };

    debug!(
        "Media post {} seen in channel {}",
        post.id.0, post.channel.0
    );
    state.client.record_post(post.clone()).await;

    if let Err(e) = state.workflow.handle_incoming(post).await {
        error!("Failed to send post to moderation: {:#}", e);
    }
    Ok(())
}

async fn handle_reaction_count(
    update: MessageReactionCountUpdated,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let total: u32 = update.reactions.iter().map(|r| r.total_count as u32).sum();
    let id = SourceId {
        channel: update.chat.id,
        message: update.message_id,
    };
    state.client.record_reaction_total(id, total).await;
    Ok(())
}

async fn handle_approval(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    // Acknowledge the click even when the entry is long gone.
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message.as_ref().and_then(|m| m.regular_message()) else {
        warn!("Approval callback without an accessible message");
        return Ok(());
    };

    // Entries are keyed by the moderation message the button sits on, so the
    // lookup uses the callback's own message id rather than the id embedded
    // in the button data.
    match state.workflow.handle_approval(message.id).await {
        ApprovalOutcome::Published => {
            info!("Moderator approved moderation message {}", message.id.0);
        }
        // Failure paths are logged inside the workflow.
        ApprovalOutcome::PublishFailed | ApprovalOutcome::NotFound => {}
    }
    Ok(())
}
