//! Chat commands and reply messages

use crate::domain::RemoteFile;
use crate::ports::{OutgoingMessage, QuickReply};

pub const CMD_CONNECT: &str = "/connect_drive";
pub const CMD_RECENT_FILES: &str = "/recent_files";
pub const CMD_DISCONNECT: &str = "/disconnect_drive";
pub const CMD_RECONNECT: &str = "/reconnect";

pub const CONNECT_PROMPT: &str = "Please connect your Google Drive account first.";
pub const RECONNECT_PROMPT: &str =
    "Your Google Drive authorization seems to have expired.\nRun /reconnect to connect again.";
pub const EMPTY_RECENT_FILES: &str = "You haven't uploaded any files yet.";
pub const RECENT_FILES_ALT_TEXT: &str = "Here are your recent files";
pub const RECENT_FILES_FAILED: &str =
    "Could not list your recent files. Please try again later.";
pub const DISCONNECTED: &str = "Successfully disconnected from Google Drive.";
pub const NOT_CONNECTED: &str = "Your account is not connected to Google Drive.";
pub const DISCONNECT_FAILED: &str =
    "An error occurred while disconnecting. Please try again later.";
pub const CONNECT_FAILED: &str =
    "An error occurred while starting authorization. Please try again later.";
pub const RECONNECT_FAILED: &str =
    "An error occurred while trying to reconnect. Please try '/connect_drive' manually.";
pub const UPLOAD_FAILED: &str =
    "Failed to upload the file to Google Drive. Please try again later.";

/// Command carried by a text message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    ConnectDrive,
    RecentFiles,
    DisconnectDrive,
    Reconnect,
    /// Not a command; the text is echoed back
    Echo(&'a str),
}

impl<'a> Command<'a> {
    /// Matches `text` against the commands in priority order
    pub fn parse(text: &'a str) -> Self {
        const TABLE: [(&str, Command<'static>); 4] = [
            (CMD_CONNECT, Command::ConnectDrive),
            (CMD_RECENT_FILES, Command::RecentFiles),
            (CMD_DISCONNECT, Command::DisconnectDrive),
            (CMD_RECONNECT, Command::Reconnect),
        ];

        let trimmed = text.trim();
        TABLE
            .iter()
            .find(|(name, _)| *name == trimmed)
            .map_or(Command::Echo(text), |(_, command)| *command)
    }
}

fn connect_button() -> QuickReply {
    QuickReply::new("Connect Google Drive", CMD_CONNECT)
}

fn reconnect_button() -> QuickReply {
    QuickReply::new("Reconnect", CMD_RECONNECT)
}

/// Quick replies offered to a connected user
fn connected_buttons() -> Vec<QuickReply> {
    vec![
        QuickReply::new("Recent files", CMD_RECENT_FILES),
        QuickReply::new("Disconnect", CMD_DISCONNECT),
    ]
}

pub fn authorization_link(url: &str) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "Please authorize this app to upload files to your Google Drive: {url}"
    ))
}

pub fn reauthorization_link(url: &str) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "Please re-authorize this app to upload files to your Google Drive: {url}"
    ))
}

pub fn connect_prompt() -> OutgoingMessage {
    OutgoingMessage::text_with_replies(CONNECT_PROMPT, vec![connect_button()])
}

pub fn reconnect_prompt() -> OutgoingMessage {
    OutgoingMessage::text_with_replies(RECONNECT_PROMPT, vec![reconnect_button()])
}

pub fn upload_succeeded(view_url: &str) -> OutgoingMessage {
    OutgoingMessage::text_with_replies(
        format!("File uploaded to Google Drive: {view_url}"),
        connected_buttons(),
    )
}

/// Carousel of `files`, or the empty-state text when there are none
pub fn recent_files(files: Vec<RemoteFile>) -> OutgoingMessage {
    if files.is_empty() {
        return OutgoingMessage::text(EMPTY_RECENT_FILES);
    }
    OutgoingMessage::FileCarousel {
        alt_text: RECENT_FILES_ALT_TEXT.to_string(),
        files,
        quick_replies: connected_buttons(),
    }
}

pub fn sticker(sticker_id: &str, resource_type: Option<&str>) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "Sticker message: sticker id is {sticker_id}, stickerResourceType is {}",
        resource_type.unwrap_or("UNKNOWN")
    ))
}
