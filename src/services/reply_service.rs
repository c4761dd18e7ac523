use crate::domain::message::{InboundMessage, TextMessage};
use crate::domain::reply::{Reply, ReplyEnvelope};
use crate::services::code_service::CodeService;
use opentelemetry::{KeyValue, global, metrics::Counter};
use time::OffsetDateTime;

const CODE_TRIGGER: &str = "验证码";
const GREETING_TRIGGERS: [&str; 2] = ["你好", "hello"];
const HELP_TRIGGERS: [&str; 2] = ["帮助", "help"];
const ABOUT_TRIGGER: &str = "关于";

const GREETING_REPLY: &str = "您好！欢迎使用我们的服务！";
const ABOUT_REPLY: &str = "我们是一个专业的服务平台，致力于为用户提供优质的服务体验。";
const HELP_REPLY: &str = "欢迎使用我们的服务！\n\n功能列表：\n1. 发送\"你好\" - 获取问候语\n2. 发送\"帮助\" - 获取帮助信息\n3. 发送\"关于\" - 了解我们\n4. 发送\"验证码\" - 获取验证码\n5. 发送图片 - 我们会回复您的图片\n\n如有其他问题，请联系客服。";
const UNKNOWN_REPLY: &str = "收到您的消息，正在处理中...";

#[derive(Clone, Debug)]
struct Metrics {
    replies_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("waypost-server");
        Self {
            replies_total: meter
                .u64_counter("waypost_replies_total")
                .with_description("Replies generated by inbound message type")
                .build(),
        }
    }
}

/// Maps an inbound message to its reply.
///
/// Pure given the message content, with one exception: the
/// verification-code trigger issues a code through the store. Text commands
/// are matched by case-sensitive substring containment, first match wins.
#[derive(Clone, Debug)]
pub struct ReplyService {
    codes: CodeService,
    metrics: Metrics,
}

impl ReplyService {
    #[must_use]
    pub fn new(codes: CodeService) -> Self {
        Self { codes, metrics: Metrics::new() }
    }

    #[must_use]
    pub fn reply(&self, message: &InboundMessage) -> Option<Reply> {
        self.reply_at(message, OffsetDateTime::now_utc())
    }

    /// Clock-injected variant of [`Self::reply`]. The reply envelope swaps
    /// the inbound user fields so the reply is addressed back to the sender.
    #[must_use]
    pub fn reply_at(&self, message: &InboundMessage, now: OffsetDateTime) -> Option<Reply> {
        self.metrics.replies_total.add(1, &[KeyValue::new("msg_type", message.msg_type().to_string())]);

        let envelope = ReplyEnvelope::addressed_back(message.envelope(), now);

        let reply = match message {
            InboundMessage::Text(msg) => self.text_reply(msg, envelope, now),
            InboundMessage::Image(msg) => {
                Reply::text(envelope, format!("收到您的图片！图片链接：{}", msg.pic_url))
            }
            InboundMessage::Voice(msg) => {
                let mut content = "收到您的语音消息！".to_string();
                if let Some(recognition) = &msg.recognition {
                    content.push_str("\n语音识别结果：");
                    content.push_str(recognition);
                }
                Reply::text(envelope, content)
            }
            InboundMessage::Video(_) => Reply::text(envelope, "收到您的视频消息！"),
            InboundMessage::Location(msg) => Reply::text(
                envelope,
                format!(
                    "收到您的位置信息！\n位置：{}\n坐标：{:.6}, {:.6}",
                    msg.label, msg.latitude, msg.longitude
                ),
            ),
            InboundMessage::Link(msg) => Reply::text(
                envelope,
                format!("收到您分享的链接！\n标题：{}\n描述：{}\n链接：{}", msg.title, msg.description, msg.url),
            ),
            InboundMessage::Unknown(_) => Reply::text(envelope, UNKNOWN_REPLY),
        };

        Some(reply)
    }

    fn text_reply(&self, msg: &TextMessage, envelope: ReplyEnvelope, now: OffsetDateTime) -> Reply {
        let content = &msg.content;

        if content.contains(CODE_TRIGGER) {
            let code = self.codes.generate_at(&msg.envelope.from_user, now);
            return Reply::text(envelope, format!("您的验证码是：{code}\n验证码有效期为10分钟，请妥善保管。"));
        }

        if GREETING_TRIGGERS.iter().any(|t| content.contains(t)) {
            return Reply::text(envelope, GREETING_REPLY);
        }

        if HELP_TRIGGERS.iter().any(|t| content.contains(t)) {
            return Reply::text(envelope, HELP_REPLY);
        }

        if content.contains(ABOUT_TRIGGER) {
            return Reply::text(envelope, ABOUT_REPLY);
        }

        Reply::text(envelope, format!("收到您的消息：{content}\n\n如需帮助，请发送\"帮助\"获取更多信息。"))
    }
}
