//! Rendering of [`OutgoingMessage`] into Messaging API message objects
//!
//! Text messages become `text` objects. File listings become a `flex`
//! carousel with one bubble per file. Quick replies attach to either kind
//! as `message` actions.

use serde_json::{json, Value};

use chatdrive_core::domain::RemoteFile;
use chatdrive_core::ports::{OutgoingMessage, QuickReply};

/// Messages accepted by one reply call
pub const MAX_MESSAGES_PER_REPLY: usize = 5;

/// Bubbles accepted by one carousel
pub const MAX_CAROUSEL_BUBBLES: usize = 12;

/// Items accepted by one quick reply bar
pub const MAX_QUICK_REPLY_ITEMS: usize = 13;

/// Label shown above each file name in the carousel
const BUBBLE_LABEL: &str = "Recent Upload";
const BUBBLE_LABEL_COLOR: &str = "#1DB446";
const OPEN_BUTTON_LABEL: &str = "Open in Drive";

/// Renders one outgoing message
pub fn render(message: &OutgoingMessage) -> Value {
    match message {
        OutgoingMessage::Text {
            text,
            quick_replies,
        } => with_quick_replies(json!({"type": "text", "text": text}), quick_replies),
        OutgoingMessage::FileCarousel {
            alt_text,
            files,
            quick_replies,
        } => {
            let bubbles: Vec<Value> = files
                .iter()
                .take(MAX_CAROUSEL_BUBBLES)
                .map(file_bubble)
                .collect();
            let flex = json!({
                "type": "flex",
                "altText": alt_text,
                "contents": {"type": "carousel", "contents": bubbles},
            });
            with_quick_replies(flex, quick_replies)
        }
    }
}

/// Renders a reply batch, keeping the first [`MAX_MESSAGES_PER_REPLY`]
pub fn render_all(messages: &[OutgoingMessage]) -> Vec<Value> {
    messages
        .iter()
        .take(MAX_MESSAGES_PER_REPLY)
        .map(render)
        .collect()
}

fn file_bubble(file: &RemoteFile) -> Value {
    json!({
        "type": "bubble",
        "body": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                {
                    "type": "text",
                    "text": BUBBLE_LABEL,
                    "weight": "bold",
                    "color": BUBBLE_LABEL_COLOR,
                    "size": "sm",
                },
                {
                    "type": "text",
                    "text": display_name(file),
                    "weight": "bold",
                    "size": "xl",
                    "margin": "md",
                    "wrap": true,
                },
            ],
        },
        "footer": {
            "type": "box",
            "layout": "vertical",
            "contents": [
                {
                    "type": "button",
                    "style": "link",
                    "height": "sm",
                    "action": {
                        "type": "uri",
                        "label": OPEN_BUTTON_LABEL,
                        "uri": file.view_url,
                    },
                },
            ],
        },
    })
}

// Flex text components reject empty strings
fn display_name(file: &RemoteFile) -> &str {
    if file.name.is_empty() {
        &file.id
    } else {
        &file.name
    }
}

fn with_quick_replies(mut message: Value, quick_replies: &[QuickReply]) -> Value {
    if quick_replies.is_empty() {
        return message;
    }

    let items: Vec<Value> = quick_replies
        .iter()
        .take(MAX_QUICK_REPLY_ITEMS)
        .map(|q| {
            json!({
                "type": "action",
                "action": {"type": "message", "label": q.label, "text": q.text},
            })
        })
        .collect();

    if let Some(obj) = message.as_object_mut() {
        obj.insert("quickReply".to_string(), json!({ "items": items }));
    }
    message
}
