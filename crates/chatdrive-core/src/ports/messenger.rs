//! Chat platform ports (driven/secondary ports)
//!
//! This module defines the outgoing message model and the two capabilities
//! the core needs from the chat platform: replying to a conversation (plus
//! linking a per-user UI affordance) and downloading message content.
//!
//! ## Design Notes
//!
//! - Replies and UI linking are fire-and-forget from the core's point of
//!   view: callers log failures and carry on.
//! - [`OutgoingMessage`] is platform-neutral; adapters render it into their
//!   wire format.

use serde::{Deserialize, Serialize};

use crate::domain::{MediaContent, RemoteFile, UserIdentity};

// ============================================================================
// Outgoing message model
// ============================================================================

/// A quick-reply button that sends `text` back as the user's message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    /// Button label
    pub label: String,
    /// Message text sent when tapped
    pub text: String,
}

impl QuickReply {
    /// Creates a quick-reply button
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// A message to send in reply to an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutgoingMessage {
    /// Plain text
    Text {
        text: String,
        quick_replies: Vec<QuickReply>,
    },
    /// A carousel with one card per file
    FileCarousel {
        alt_text: String,
        files: Vec<RemoteFile>,
        quick_replies: Vec<QuickReply>,
    },
}

impl OutgoingMessage {
    /// Plain text without quick replies
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            quick_replies: Vec::new(),
        }
    }

    /// Plain text with quick replies
    pub fn text_with_replies(text: impl Into<String>, quick_replies: Vec<QuickReply>) -> Self {
        Self::Text {
            text: text.into(),
            quick_replies,
        }
    }
}

// ============================================================================
// Ports
// ============================================================================

/// Sends replies and links UI affordances
#[async_trait::async_trait]
pub trait IChatMessenger: Send + Sync {
    /// Replies to the conversation identified by `reply_token`
    async fn reply(&self, reply_token: &str, messages: &[OutgoingMessage]) -> anyhow::Result<()>;

    /// Links the UI affordance `affordance_id` (e.g. a rich menu) to `user`
    async fn link_ui_state(&self, user: &UserIdentity, affordance_id: &str) -> anyhow::Result<()>;
}

/// Downloads the body of a media message
#[async_trait::async_trait]
pub trait IMessageContentSource: Send + Sync {
    /// Opens a stream over the content of message `message_id`
    async fn fetch_content(&self, message_id: &str) -> anyhow::Result<MediaContent>;
}
