//! Slack Web API client.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};

use super::error::SlackError;
use super::types::{Block, ConversationInfoResponse, PostMessageResponse, SlackMessage};
use crate::config::SlackConfig;

/// Slack Web API base URL.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Slack API client bound to one channel.
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    bot_token: SecretString,
    channel: String,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("bot_token", &"[REDACTED]")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    /// Create a new Slack client.
    #[must_use]
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            client: Client::new(),
            bot_token: config.bot_token.clone(),
            channel: config.channel_id.clone(),
        }
    }

    /// The channel messages are posted to.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Check that the bot has joined the channel.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Slack returns an error.
    #[instrument(skip(self), fields(channel = %self.channel))]
    pub async fn is_member(&self) -> Result<bool, SlackError> {
        let response = self
            .client
            .get(format!("{SLACK_API_BASE}/conversations.info"))
            .bearer_auth(self.bot_token.expose_secret())
            .query(&[("channel", self.channel.as_str())])
            .send()
            .await?;

        let result: ConversationInfoResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        Ok(result.channel.is_some_and(|c| c.is_member))
    }

    /// Post a message to the channel.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Slack returns an error.
    #[instrument(skip(self, blocks), fields(channel = %self.channel))]
    pub async fn post_message(
        &self,
        blocks: Vec<Block>,
        fallback_text: Option<&str>,
    ) -> Result<PostMessageResponse, SlackError> {
        let message = SlackMessage {
            channel: self.channel.clone(),
            blocks,
            text: fallback_text.map(String::from),
        };

        let response = self
            .client
            .post(format!("{SLACK_API_BASE}/chat.postMessage"))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&message)
            .send()
            .await?;

        let result: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            error!(
                error = ?result.error,
                "Slack API error posting message"
            );
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        debug!(
            ts = ?result.ts,
            channel = ?result.channel,
            "Message posted to Slack"
        );

        Ok(result)
    }
}
