use crate::domain::message::Envelope;
use crate::error::Result;
use serde::Serialize;
use time::OffsetDateTime;

/// Shared header of every outbound reply. Always addressed back to the
/// sender of the inbound message, with the user fields swapped.
#[derive(Debug, Clone)]
pub struct ReplyEnvelope {
    pub to_user: String,
    pub from_user: String,
    pub created_at: i64,
}

impl ReplyEnvelope {
    #[must_use]
    pub fn addressed_back(inbound: &Envelope, now: OffsetDateTime) -> Self {
        Self {
            to_user: inbound.from_user.clone(),
            from_user: inbound.to_user.clone(),
            created_at: now.unix_timestamp(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextReply {
    pub envelope: ReplyEnvelope,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ImageReply {
    pub envelope: ReplyEnvelope,
    pub media_id: String,
}

#[derive(Debug, Clone)]
pub struct VoiceReply {
    pub envelope: ReplyEnvelope,
    pub media_id: String,
}

#[derive(Debug, Clone)]
pub struct VideoReply {
    pub envelope: ReplyEnvelope,
    pub media_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub pic_url: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct NewsReply {
    pub envelope: ReplyEnvelope,
    pub articles: Vec<Article>,
}

/// Closed set of outbound reply variants. Constructed only by the reply
/// policy and serialized exactly once by the webhook handler.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(TextReply),
    Image(ImageReply),
    Voice(VoiceReply),
    Video(VideoReply),
    News(NewsReply),
}

impl Reply {
    #[must_use]
    pub fn text(envelope: ReplyEnvelope, content: impl Into<String>) -> Self {
        Self::Text(TextReply { envelope, content: content.into() })
    }

    /// Serializes the reply into the platform wire format (root element
    /// `xml`, `CreateTime` as epoch seconds, media ids nested under their
    /// variant element).
    ///
    /// # Errors
    /// Returns `AppError::Encode` if serialization fails.
    pub fn to_xml(&self) -> Result<String> {
        let xml = match self {
            Self::Text(reply) => quick_xml::se::to_string_with_root(
                "xml",
                &TextReplyXml {
                    to_user: &reply.envelope.to_user,
                    from_user: &reply.envelope.from_user,
                    created_at: reply.envelope.created_at,
                    msg_type: "text",
                    content: &reply.content,
                },
            )?,
            Self::Image(reply) => quick_xml::se::to_string_with_root(
                "xml",
                &MediaReplyXml {
                    to_user: &reply.envelope.to_user,
                    from_user: &reply.envelope.from_user,
                    created_at: reply.envelope.created_at,
                    msg_type: "image",
                    image: Some(MediaRefXml { media_id: &reply.media_id }),
                    voice: None,
                },
            )?,
            Self::Voice(reply) => quick_xml::se::to_string_with_root(
                "xml",
                &MediaReplyXml {
                    to_user: &reply.envelope.to_user,
                    from_user: &reply.envelope.from_user,
                    created_at: reply.envelope.created_at,
                    msg_type: "voice",
                    image: None,
                    voice: Some(MediaRefXml { media_id: &reply.media_id }),
                },
            )?,
            Self::Video(reply) => quick_xml::se::to_string_with_root(
                "xml",
                &VideoReplyXml {
                    to_user: &reply.envelope.to_user,
                    from_user: &reply.envelope.from_user,
                    created_at: reply.envelope.created_at,
                    msg_type: "video",
                    video: VideoRefXml {
                        media_id: &reply.media_id,
                        title: reply.title.as_deref(),
                        description: reply.description.as_deref(),
                    },
                },
            )?,
            Self::News(reply) => quick_xml::se::to_string_with_root(
                "xml",
                &NewsReplyXml {
                    to_user: &reply.envelope.to_user,
                    from_user: &reply.envelope.from_user,
                    created_at: reply.envelope.created_at,
                    msg_type: "news",
                    article_count: reply.articles.len(),
                    articles: ArticlesXml {
                        item: reply
                            .articles
                            .iter()
                            .map(|a| ArticleXml {
                                title: &a.title,
                                description: &a.description,
                                pic_url: &a.pic_url,
                                url: &a.url,
                            })
                            .collect(),
                    },
                },
            )?,
        };

        Ok(xml)
    }
}

#[derive(Debug, Serialize)]
struct TextReplyXml<'a> {
    #[serde(rename = "ToUserName")]
    to_user: &'a str,
    #[serde(rename = "FromUserName")]
    from_user: &'a str,
    #[serde(rename = "CreateTime")]
    created_at: i64,
    #[serde(rename = "MsgType")]
    msg_type: &'a str,
    #[serde(rename = "Content")]
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MediaRefXml<'a> {
    #[serde(rename = "MediaId")]
    media_id: &'a str,
}

#[derive(Debug, Serialize)]
struct MediaReplyXml<'a> {
    #[serde(rename = "ToUserName")]
    to_user: &'a str,
    #[serde(rename = "FromUserName")]
    from_user: &'a str,
    #[serde(rename = "CreateTime")]
    created_at: i64,
    #[serde(rename = "MsgType")]
    msg_type: &'a str,
    #[serde(rename = "Image", skip_serializing_if = "Option::is_none")]
    image: Option<MediaRefXml<'a>>,
    #[serde(rename = "Voice", skip_serializing_if = "Option::is_none")]
    voice: Option<MediaRefXml<'a>>,
}

#[derive(Debug, Serialize)]
struct VideoRefXml<'a> {
    #[serde(rename = "MediaId")]
    media_id: &'a str,
    #[serde(rename = "Title", skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct VideoReplyXml<'a> {
    #[serde(rename = "ToUserName")]
    to_user: &'a str,
    #[serde(rename = "FromUserName")]
    from_user: &'a str,
    #[serde(rename = "CreateTime")]
    created_at: i64,
    #[serde(rename = "MsgType")]
    msg_type: &'a str,
    #[serde(rename = "Video")]
    video: VideoRefXml<'a>,
}

#[derive(Debug, Serialize)]
struct ArticleXml<'a> {
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "PicUrl")]
    pic_url: &'a str,
    #[serde(rename = "Url")]
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct ArticlesXml<'a> {
    item: Vec<ArticleXml<'a>>,
}

#[derive(Debug, Serialize)]
struct NewsReplyXml<'a> {
    #[serde(rename = "ToUserName")]
    to_user: &'a str,
    #[serde(rename = "FromUserName")]
    from_user: &'a str,
    #[serde(rename = "CreateTime")]
    created_at: i64,
    #[serde(rename = "MsgType")]
    msg_type: &'a str,
    #[serde(rename = "ArticleCount")]
    article_count: usize,
    #[serde(rename = "Articles")]
    articles: ArticlesXml<'a>,
}
