use crate::error::Result;
use serde::Deserialize;

/// Fields shared by every inbound message, read in the first decode pass.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "ToUserName")]
    pub to_user: String,
    #[serde(rename = "FromUserName")]
    pub from_user: String,
    /// Platform-supplied epoch seconds.
    #[serde(rename = "CreateTime")]
    pub created_at: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "MsgId", default)]
    pub msg_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct TextMessage {
    pub envelope: Envelope,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ImageMessage {
    pub envelope: Envelope,
    pub pic_url: String,
    pub media_id: String,
}

#[derive(Debug, Clone)]
pub struct VoiceMessage {
    pub envelope: Envelope,
    pub media_id: String,
    pub format: String,
    /// Transcript filled in when speech recognition is enabled on the account.
    pub recognition: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VideoMessage {
    pub envelope: Envelope,
    pub media_id: String,
    pub thumb_media_id: String,
}

#[derive(Debug, Clone)]
pub struct LocationMessage {
    pub envelope: Envelope,
    pub latitude: f64,
    pub longitude: f64,
    pub scale: i32,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct LinkMessage {
    pub envelope: Envelope,
    pub title: String,
    pub description: String,
    pub url: String,
}

/// Closed set of inbound message variants. Message types the gateway does
/// not model decode into `Unknown`, never into a decode error: the platform
/// expects a 2xx acknowledgment regardless of message type.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Text(TextMessage),
    Image(ImageMessage),
    Voice(VoiceMessage),
    Video(VideoMessage),
    Location(LocationMessage),
    Link(LinkMessage),
    Unknown(Envelope),
}

// Variant payloads tolerate absent elements the way the platform's own
// clients do: a missing field decodes to its default, never a decode error.

#[derive(Debug, Deserialize)]
struct TextPayload {
    #[serde(rename = "Content", default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ImagePayload {
    #[serde(rename = "PicUrl", default)]
    pic_url: String,
    #[serde(rename = "MediaId", default)]
    media_id: String,
}

#[derive(Debug, Deserialize)]
struct VoicePayload {
    #[serde(rename = "MediaId", default)]
    media_id: String,
    #[serde(rename = "Format", default)]
    format: String,
    #[serde(rename = "Recognition", default)]
    recognition: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoPayload {
    #[serde(rename = "MediaId", default)]
    media_id: String,
    #[serde(rename = "ThumbMediaId", default)]
    thumb_media_id: String,
}

#[derive(Debug, Deserialize)]
struct LocationPayload {
    #[serde(rename = "Location_X", default)]
    latitude: f64,
    #[serde(rename = "Location_Y", default)]
    longitude: f64,
    #[serde(rename = "Scale", default)]
    scale: i32,
    #[serde(rename = "Label", default)]
    label: String,
}

#[derive(Debug, Deserialize)]
struct LinkPayload {
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Url", default)]
    url: String,
}

impl InboundMessage {
    /// Decodes a raw webhook payload.
    ///
    /// The envelope is parsed first to read the `MsgType` discriminator, then
    /// the payload is re-parsed into the selected variant. This keeps each
    /// variant struct free of every other variant's fields and lets an
    /// unrecognized discriminator fall back to the bare envelope.
    ///
    /// # Errors
    /// Returns `AppError::Decode` if the payload is not well-formed XML or a
    /// recognized variant is missing its required fields.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let envelope: Envelope = quick_xml::de::from_reader(raw)?;

        let message = match envelope.msg_type.as_str() {
            "text" => {
                let p: TextPayload = quick_xml::de::from_reader(raw)?;
                Self::Text(TextMessage { envelope, content: p.content })
            }
            "image" => {
                let p: ImagePayload = quick_xml::de::from_reader(raw)?;
                Self::Image(ImageMessage { envelope, pic_url: p.pic_url, media_id: p.media_id })
            }
            "voice" => {
                let p: VoicePayload = quick_xml::de::from_reader(raw)?;
                Self::Voice(VoiceMessage {
                    envelope,
                    media_id: p.media_id,
                    format: p.format,
                    recognition: p.recognition.filter(|r| !r.is_empty()),
                })
            }
            "video" => {
                let p: VideoPayload = quick_xml::de::from_reader(raw)?;
                Self::Video(VideoMessage { envelope, media_id: p.media_id, thumb_media_id: p.thumb_media_id })
            }
            "location" => {
                let p: LocationPayload = quick_xml::de::from_reader(raw)?;
                Self::Location(LocationMessage {
                    envelope,
                    latitude: p.latitude,
                    longitude: p.longitude,
                    scale: p.scale,
                    label: p.label,
                })
            }
            "link" => {
                let p: LinkPayload = quick_xml::de::from_reader(raw)?;
                Self::Link(LinkMessage { envelope, title: p.title, description: p.description, url: p.url })
            }
            _ => Self::Unknown(envelope),
        };

        Ok(message)
    }

    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        match self {
            Self::Text(m) => &m.envelope,
            Self::Image(m) => &m.envelope,
            Self::Voice(m) => &m.envelope,
            Self::Video(m) => &m.envelope,
            Self::Location(m) => &m.envelope,
            Self::Link(m) => &m.envelope,
            Self::Unknown(envelope) => envelope,
        }
    }

    /// Discriminator value as it appeared on the wire.
    #[must_use]
    pub fn msg_type(&self) -> &str {
        &self.envelope().msg_type
    }
}
