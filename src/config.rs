use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::Path;
use teloxide::types::ChatId;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub curation: CurationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelsConfig {
    /// Channels the bot watches for candidate posts.
    pub sources: Vec<i64>,
    /// Channel approved posts are published to.
    pub target: i64,
    /// Chat where candidates wait for the moderator's click.
    pub moderation: i64,
}

impl ChannelsConfig {
    pub fn source_ids(&self) -> Vec<ChatId> {
        self.sources.iter().copied().map(ChatId).collect()
    }

    pub fn target_id(&self) -> ChatId {
        ChatId(self.target)
    }

    pub fn moderation_id(&self) -> ChatId {
        ChatId(self.moderation)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CurationConfig {
    /// Engagement ratio (percent) a post needs to count as popular.
    #[serde(default = "default_min_engagement_percentage")]
    pub min_engagement_percentage: f64,
    /// Minimum hours before the scan may revisit the same channel.
    #[serde(default = "default_channel_cooldown_hours")]
    pub channel_cooldown_hours: i64,
    #[serde(default = "default_scan_interval_minutes")]
    pub scan_interval_minutes: u64,
    #[serde(default = "default_scan_initial_delay_secs")]
    pub scan_initial_delay_secs: u64,
    /// How many recent posts a single scan considers per channel.
    #[serde(default = "default_scan_fetch_limit")]
    pub scan_fetch_limit: usize,
    /// Per-channel cap of the recent-post cache.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            min_engagement_percentage: default_min_engagement_percentage(),
            channel_cooldown_hours: default_channel_cooldown_hours(),
            scan_interval_minutes: default_scan_interval_minutes(),
            scan_initial_delay_secs: default_scan_initial_delay_secs(),
            scan_fetch_limit: default_scan_fetch_limit(),
            history_capacity: default_history_capacity(),
        }
    }
}

fn default_min_engagement_percentage() -> f64 {
    5.0
}

fn default_channel_cooldown_hours() -> i64 {
    6
}

fn default_scan_interval_minutes() -> u64 {
    30
}

fn default_scan_initial_delay_secs() -> u64 {
    10
}

fn default_scan_fetch_limit() -> usize {
    10
}

fn default_history_capacity() -> usize {
    50
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        ensure!(
            !config.channels.sources.is_empty(),
            "at least one source channel must be configured"
        );
        ensure!(
            config.curation.min_engagement_percentage >= 0.0,
            "min_engagement_percentage must not be negative"
        );
        ensure!(
            config.curation.channel_cooldown_hours >= 0,
            "channel_cooldown_hours must not be negative"
        );
        ensure!(
            config.curation.scan_interval_minutes > 0,
            "scan_interval_minutes must be positive"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_curation_defaults() {
        let config: Config = toml::from_str(
            r#"
            [telegram]
            bot_token = "123:abc"

            [channels]
            sources = [-1001, -1002]
            target = -2000
            moderation = -3000
            "#,
        )
        .unwrap();

        assert_eq!(config.channels.sources.len(), 2);
        assert_eq!(config.curation.min_engagement_percentage, 5.0);
        assert_eq!(config.curation.channel_cooldown_hours, 6);
        assert_eq!(config.curation.scan_interval_minutes, 30);
        assert_eq!(config.curation.scan_fetch_limit, 10);
    }

    #[test]
    fn curation_overrides_are_applied() {
        let config: Config = toml::from_str(
            r#"
            [telegram]
            bot_token = "123:abc"

            [channels]
            sources = [-1001]
            target = -2000
            moderation = -3000

            [curation]
            min_engagement_percentage = 12.5
            channel_cooldown_hours = 2
            scan_fetch_limit = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.curation.min_engagement_percentage, 12.5);
        assert_eq!(config.curation.channel_cooldown_hours, 2);
        assert_eq!(config.curation.scan_fetch_limit, 25);
        // untouched keys keep their defaults
        assert_eq!(config.curation.scan_interval_minutes, 30);
    }

    #[test]
    fn chat_id_accessors_wrap_raw_ids() {
        let channels = ChannelsConfig {
            sources: vec![-1001],
            target: -2000,
            moderation: -3000,
        };
        assert_eq!(channels.source_ids(), vec![ChatId(-1001)]);
        assert_eq!(channels.target_id(), ChatId(-2000));
        assert_eq!(channels.moderation_id(), ChatId(-3000));
    }
}
