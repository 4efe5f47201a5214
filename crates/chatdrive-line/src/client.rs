//! Messaging API HTTP client
//!
//! [`LineClient`] implements both chat-facing ports:
//! - [`IChatMessenger`] via `POST /v2/bot/message/reply` and
//!   `POST /v2/bot/user/{userId}/richmenu/{richMenuId}`
//! - [`IMessageContentSource`] via `GET /v2/bot/message/{messageId}/content`
//!   on the data API host, streamed without buffering

use anyhow::Context;
use futures_util::TryStreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::json;
use tracing::debug;

use chatdrive_core::config::LineConfig;
use chatdrive_core::domain::{MediaContent, UserIdentity};
use chatdrive_core::ports::{IChatMessenger, IMessageContentSource, OutgoingMessage};

use crate::message::render_all;
use crate::LineError;

/// Default base URL for reply and rich menu calls
pub const LINE_API_BASE_URL: &str = "https://api.line.me";

/// Default base URL for message content downloads
pub const LINE_DATA_API_BASE_URL: &str = "https://api-data.line.me";

/// Authenticated client for one LINE channel
#[derive(Clone)]
pub struct LineClient {
    client: Client,
    api_base_url: String,
    data_api_base_url: String,
    access_token: String,
}

impl LineClient {
    /// Creates a client for the public Messaging API endpoints
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_urls(access_token, LINE_API_BASE_URL, LINE_DATA_API_BASE_URL)
    }

    /// Creates a client with custom base URLs (useful for testing)
    pub fn with_base_urls(
        access_token: impl Into<String>,
        api_base_url: impl Into<String>,
        data_api_base_url: impl Into<String>,
    ) -> Self {
        let api_base_url: String = api_base_url.into();
        let data_api_base_url: String = data_api_base_url.into();
        Self {
            client: Client::new(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            data_api_base_url: data_api_base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Creates a client from the `[line]` configuration section
    pub fn from_config(config: &LineConfig) -> Self {
        Self::with_base_urls(
            &config.channel_access_token,
            &config.api_base_url,
            &config.data_api_base_url,
        )
    }

    fn request(&self, method: Method, base: &str, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", base, path))
            .bearer_auth(&self.access_token)
    }

    /// Sends a reply batch for a webhook reply token
    pub async fn send_reply(
        &self,
        reply_token: &str,
        messages: &[OutgoingMessage],
    ) -> Result<(), LineError> {
        let body = json!({
            "replyToken": reply_token,
            "messages": render_all(messages),
        });

        debug!(count = messages.len(), "Sending reply");
        let response = self
            .request(Method::POST, &self.api_base_url, "/v2/bot/message/reply")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LineError::from_response(response).await);
        }
        Ok(())
    }

    /// Links a rich menu to a user
    pub async fn link_rich_menu(
        &self,
        user_id: &str,
        rich_menu_id: &str,
    ) -> Result<(), LineError> {
        let path = format!(
            "/v2/bot/user/{}/richmenu/{}",
            path_segment(user_id)?,
            path_segment(rich_menu_id)?
        );

        debug!(user = user_id, rich_menu = rich_menu_id, "Linking rich menu");
        let response = self
            .request(Method::POST, &self.api_base_url, &path)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LineError::from_response(response).await);
        }
        Ok(())
    }

    /// Opens a streaming download of a message's binary content
    pub async fn download_content(&self, message_id: &str) -> Result<MediaContent, LineError> {
        let path = format!("/v2/bot/message/{}/content", path_segment(message_id)?);

        debug!(message_id, "Downloading message content");
        let response = self
            .request(Method::GET, &self.data_api_base_url, &path)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LineError::from_response(response).await);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));

        let mut content = MediaContent::new(Box::pin(stream));
        content.content_type = content_type;
        content.content_length = content_length;
        Ok(content)
    }
}

// Ids are opaque tokens; anything that would reshape the URL path is refused
fn path_segment(id: &str) -> Result<&str, LineError> {
    if !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(id)
    } else {
        Err(LineError::InvalidIdentifier(id.to_string()))
    }
}

#[async_trait::async_trait]
impl IChatMessenger for LineClient {
    async fn reply(&self, reply_token: &str, messages: &[OutgoingMessage]) -> anyhow::Result<()> {
        self.send_reply(reply_token, messages)
            .await
            .context("Failed to send reply")
    }

    async fn link_ui_state(&self, user: &UserIdentity, affordance_id: &str) -> anyhow::Result<()> {
        self.link_rich_menu(user.as_str(), affordance_id)
            .await
            .with_context(|| format!("Failed to link rich menu {}", affordance_id))
    }
}

#[async_trait::async_trait]
impl IMessageContentSource for LineClient {
    async fn fetch_content(&self, message_id: &str) -> anyhow::Result<MediaContent> {
        self.download_content(message_id)
            .await
            .with_context(|| format!("Failed to fetch content of message {}", message_id))
    }
}
