use serde::Deserialize;
use tracing::debug;

use crate::model::{ContentType, MessageStatus};

/// One independent unit of work extracted from a webhook delivery.
///
/// Everything arriving at the boundary is validated into this tagged shape
/// before it reaches domain logic; payload fragments that fit neither
/// variant are dropped during parsing.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(MessageEvent),
    Status(StatusEvent),
}

#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Sender phone number (wa_id).
    pub sender: String,
    pub channel_message_id: String,
    pub content: String,
    pub content_type: ContentType,
    /// Display name from the contact profile, when the platform sent one.
    pub profile_name: Option<String>,
    /// Channel id of the message this one replies to.
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub channel_message_id: String,
    pub status: MessageStatus,
}

// ---- WhatsApp Cloud API webhook payload (graph.facebook.com) ----

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<RawMessage>,
    #[serde(default)]
    pub statuses: Vec<RawStatus>,
}

#[derive(Debug, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: String,
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Deserialize)]
pub struct ContactProfile {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub message_type: String,
    pub text: Option<TextBody>,
    pub image: Option<MediaBody>,
    pub audio: Option<MediaBody>,
    pub video: Option<MediaBody>,
    pub document: Option<MediaBody>,
    pub context: Option<MessageContext>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaBody {
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageContext {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawStatus {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
}

/// Flatten a delivery into independent events. A delivery may carry several
/// message and status events across entries; each is extracted on its own so
/// one bad fragment cannot abort its siblings.
pub fn extract_events(payload: &WebhookPayload) -> Vec<InboundEvent> {
    let mut events = Vec::new();
    for entry in &payload.entry {
        for change in &entry.changes {
            if change.field != "messages" {
                debug!("ignoring webhook change field '{}'", change.field);
                continue;
            }
            let value = &change.value;
            for raw in &value.messages {
                if raw.from.is_empty() || raw.id.is_empty() {
                    debug!("dropping message event without sender or id");
                    continue;
                }
                events.push(InboundEvent::Message(to_message_event(raw, value)));
            }
            for raw in &value.statuses {
                let Some(status) = MessageStatus::parse(&raw.status) else {
                    debug!("dropping status event with unknown status '{}'", raw.status);
                    continue;
                };
                if raw.id.is_empty() {
                    continue;
                }
                events.push(InboundEvent::Status(StatusEvent {
                    channel_message_id: raw.id.clone(),
                    status,
                }));
            }
        }
    }
    events
}

fn to_message_event(raw: &RawMessage, value: &ChangeValue) -> MessageEvent {
    let (content_type, content) = match raw.message_type.as_str() {
        "text" => (
            ContentType::Text,
            raw.text.as_ref().map(|t| t.body.clone()).unwrap_or_default(),
        ),
        "image" => (ContentType::Image, media_content(raw.image.as_ref(), "image")),
        "audio" => (ContentType::Audio, media_content(raw.audio.as_ref(), "audio")),
        "video" => (ContentType::Video, media_content(raw.video.as_ref(), "video")),
        "document" => (
            ContentType::Document,
            media_content(raw.document.as_ref(), "document"),
        ),
        other => (ContentType::Other, format!("[{}]", other)),
    };

    let profile_name = value
        .contacts
        .iter()
        .find(|c| c.wa_id == raw.from)
        .or_else(|| value.contacts.first())
        .and_then(|c| c.profile.as_ref())
        .map(|p| p.name.clone())
        .filter(|n| !n.is_empty());

    MessageEvent {
        sender: raw.from.clone(),
        channel_message_id: raw.id.clone(),
        content,
        content_type,
        profile_name,
        reply_to: raw.context.as_ref().and_then(|c| c.id.clone()),
    }
}

fn media_content(media: Option<&MediaBody>, tag: &str) -> String {
    media
        .and_then(|m| m.caption.clone())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| format!("[{}]", tag))
}
