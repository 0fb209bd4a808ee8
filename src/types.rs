use teloxide::types::{ChatId, FileId, Message, MessageId};

/// Media payload of a source post. Both the moderation hand-off and the
/// publish path go through the single `file_id` accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    Photo(FileId),
    Animation(FileId),
}

impl MediaRef {
    pub fn file_id(&self) -> &FileId {
        match self {
            MediaRef::Photo(id) | MediaRef::Animation(id) => id,
        }
    }
}

/// Globally unique identifier of a source post. Telegram message ids are
/// unique only within a chat, so the channel id is part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId {
    pub channel: ChatId,
    pub message: MessageId,
}

/// A photo/animation post fetched from a source channel. Immutable once
/// built; engagement counters are `None` until observed.
#[derive(Debug, Clone)]
pub struct SourceMessage {
    pub id: MessageId,
    pub channel: ChatId,
    pub media: MediaRef,
    pub caption: Option<String>,
    /// Public t.me link of the post, used for attribution in the moderation
    /// chat. Absent for private channels.
    pub link: Option<String>,
    pub likes: Option<u32>,
    pub comments: Option<u32>,
}

impl SourceMessage {
    pub fn source_id(&self) -> SourceId {
        SourceId {
            channel: self.channel,
            message: self.id,
        }
    }

    /// Build from a raw Telegram message; `None` when the message carries
    /// neither a photo nor an animation. Picks the largest photo size.
    pub fn from_telegram(msg: &Message) -> Option<Self> {
        let media = if let Some(sizes) = msg.photo() {
            MediaRef::Photo(sizes.last()?.file.id.clone())
        } else if let Some(animation) = msg.animation() {
            MediaRef::Animation(animation.file.id.clone())
        } else {
            return None;
        };

        Some(Self {
            id: msg.id,
            channel: msg.chat.id,
            media,
            caption: msg.caption().map(str::to_owned),
            link: msg.url().map(|url| url.to_string()),
            likes: None,
            comments: None,
        })
    }
}
