//! Slack Block Kit types for building rich messages.
//!
//! The subset of Slack Block Kit used for order summaries.
//!
//! See: <https://api.slack.com/block-kit>

use serde::{Deserialize, Serialize};

/// A Slack message with blocks.
#[derive(Debug, Clone, Serialize)]
pub struct SlackMessage {
    /// Channel ID to post to.
    pub channel: String,
    /// Message blocks.
    pub blocks: Vec<Block>,
    /// Plain text fallback for notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Block Kit block types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Header block with large text.
    Header { text: PlainText },
    /// Section block with text.
    Section { text: Text },
    /// Context block with small muted text.
    Context { elements: Vec<ContextElement> },
    /// Divider block (horizontal line).
    Divider,
}

/// Text object types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    /// Markdown text (supports formatting).
    Mrkdwn { text: String },
}

impl Text {
    /// Create a markdown text object.
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

/// Plain text object (for headers).
#[derive(Debug, Clone, Serialize)]
pub struct PlainText {
    #[serde(rename = "type")]
    pub text_type: &'static str,
    pub text: String,
    pub emoji: bool,
}

impl PlainText {
    /// Create a new plain text object.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text_type: "plain_text",
            text: text.into(),
            emoji: true,
        }
    }
}

/// Context block elements.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextElement {
    Mrkdwn { text: String },
}

/// Response from `chat.postMessage`.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

/// Response from `conversations.info`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationInfoResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub channel: Option<ChannelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelInfo {
    #[serde(default)]
    pub is_member: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_serialize_with_type_tags() {
        let blocks = vec![
            Block::Header {
                text: PlainText::new("New Order #7"),
            },
            Block::Section {
                text: Text::mrkdwn("*bold*"),
            },
            Block::Divider,
        ];
        let json = serde_json::to_value(&blocks).unwrap();
        assert_eq!(json[0]["type"], "header");
        assert_eq!(json[0]["text"]["type"], "plain_text");
        assert_eq!(json[1]["text"]["type"], "mrkdwn");
        assert_eq!(json[2]["type"], "divider");
    }

    #[test]
    fn test_conversation_info_defaults_membership() {
        let info: ConversationInfoResponse =
            serde_json::from_str(r#"{"ok":true,"channel":{"id":"C123"}}"#).unwrap();
        assert!(!info.channel.unwrap().is_member);
    }
}
