//! Incoming chat events
//!
//! A closed sum type over the webhook event and message shapes the service
//! reacts to. Unknown tags deserialize into the `Unsupported` variants so a
//! platform addition never fails a whole delivery.

use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::newtypes::UserIdentity;

/// Prefix for generated media file names
const UPLOAD_FILE_PREFIX: &str = "line-bot-upload";

/// One webhook delivery
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookPayload {
    /// Bot user the delivery is addressed to
    #[serde(default)]
    pub destination: String,
    /// Events in delivery order
    ///
    /// Events that do not match their declared shape are dropped one by one,
    /// so the rest of the batch is still delivered.
    #[serde(default, deserialize_with = "deserialize_events")]
    pub events: Vec<ChatEvent>,
}

fn deserialize_events<'de, D>(deserializer: D) -> Result<Vec<ChatEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let mut events = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match ChatEvent::deserialize(value) {
            Ok(event) => events.push(event),
            Err(e) => warn!(index, error = %e, "Skipping malformed webhook event"),
        }
    }
    Ok(events)
}

/// A webhook event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatEvent {
    /// A message was sent to the bot
    #[serde(rename_all = "camelCase")]
    Message {
        #[serde(default)]
        reply_token: String,
        source: EventSource,
        message: MessageContent,
    },
    /// The bot was added as a friend or unblocked
    #[serde(rename_all = "camelCase")]
    Follow {
        #[serde(default)]
        reply_token: String,
        source: EventSource,
    },
    /// The bot was blocked
    Unfollow { source: EventSource },
    /// The bot joined a group or room
    #[serde(rename_all = "camelCase")]
    Join {
        #[serde(default)]
        reply_token: String,
        source: EventSource,
    },
    /// The bot left a group or room
    Leave { source: EventSource },
    /// Users joined a group the bot is in
    #[serde(rename_all = "camelCase")]
    MemberJoined {
        #[serde(default)]
        reply_token: String,
        source: EventSource,
        joined: Members,
    },
    /// Users left a group the bot is in
    MemberLeft { source: EventSource, left: Members },
    /// A user entered the range of a beacon
    #[serde(rename_all = "camelCase")]
    Beacon {
        #[serde(default)]
        reply_token: String,
        source: EventSource,
        beacon: BeaconInfo,
    },
    /// A postback action was triggered
    #[serde(rename_all = "camelCase")]
    Postback {
        #[serde(default)]
        reply_token: String,
        source: EventSource,
        postback: PostbackInfo,
    },
    /// Any event type this service does not handle
    #[serde(other)]
    Unsupported,
}

impl ChatEvent {
    /// Short name for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Follow { .. } => "follow",
            Self::Unfollow { .. } => "unfollow",
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::MemberJoined { .. } => "memberJoined",
            Self::MemberLeft { .. } => "memberLeft",
            Self::Beacon { .. } => "beacon",
            Self::Postback { .. } => "postback",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Where an event came from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventSource {
    /// One-to-one chat
    #[serde(rename_all = "camelCase")]
    User { user_id: String },
    /// Group chat; `user_id` is absent when the user has not consented
    #[serde(rename_all = "camelCase")]
    Group {
        group_id: String,
        user_id: Option<String>,
    },
    /// Multi-person room
    #[serde(rename_all = "camelCase")]
    Room {
        room_id: String,
        user_id: Option<String>,
    },
}

impl EventSource {
    /// The acting user, if the platform supplied one
    pub fn user_identity(&self) -> Option<UserIdentity> {
        let id = match self {
            Self::User { user_id } => Some(user_id.as_str()),
            Self::Group { user_id, .. } | Self::Room { user_id, .. } => user_id.as_deref(),
        };
        id.and_then(|id| UserIdentity::new(id).ok())
    }
}

/// Users listed in a membership event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Members {
    #[serde(default)]
    pub members: Vec<EventSource>,
}

/// Beacon details
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BeaconInfo {
    /// Hardware ID of the beacon
    pub hwid: String,
    /// `enter`, `banner`, or `stay`
    #[serde(rename = "type")]
    pub kind: String,
}

/// Postback details
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostbackInfo {
    pub data: String,
}

/// Message body, tagged by kind
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageContent {
    Text {
        id: String,
        text: String,
    },
    Image {
        id: String,
    },
    Video {
        id: String,
    },
    Audio {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    File {
        id: String,
        file_name: String,
        file_size: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Sticker {
        id: String,
        package_id: String,
        sticker_id: String,
        sticker_resource_type: Option<String>,
    },
    Location {
        id: String,
        title: Option<String>,
        address: Option<String>,
        latitude: f64,
        longitude: f64,
    },
    #[serde(other)]
    Unsupported,
}

impl MessageContent {
    /// Destination file name for media messages, `None` for everything else
    ///
    /// Every name embeds the message id so repeated uploads never collide.
    pub fn upload_file_name(&self) -> Option<String> {
        match self {
            Self::Image { id } => Some(format!("{UPLOAD_FILE_PREFIX}-{id}.jpg")),
            Self::Video { id } => Some(format!("{UPLOAD_FILE_PREFIX}-{id}.mp4")),
            Self::Audio { id } => Some(format!("{UPLOAD_FILE_PREFIX}-{id}.m4a")),
            Self::File { id, file_name, .. } => Some(format!("{id}-{file_name}")),
            Self::Text { .. }
            | Self::Sticker { .. }
            | Self::Location { .. }
            | Self::Unsupported => None,
        }
    }

    /// Platform message id, when the kind carries one
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Text { id, .. }
            | Self::Image { id }
            | Self::Video { id }
            | Self::Audio { id }
            | Self::File { id, .. }
            | Self::Sticker { id, .. }
            | Self::Location { id, .. } => Some(id.as_str()),
            Self::Unsupported => None,
        }
    }
}
