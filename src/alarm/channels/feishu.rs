//! 飞书机器人渠道（富文本 post 消息：一段文本 + 详情链接）

use crate::alarm::channel::{AlarmSummary, WebhookChannel, WebhookPayload};
use crate::model::JobInfo;
use serde::Serialize;

#[derive(Serialize)]
struct FeiShuMessage<'a> {
    msg_type: &'static str,
    content: PostContent<'a>,
}

#[derive(Serialize)]
struct PostContent<'a> {
    post: Post<'a>,
}

#[derive(Serialize)]
struct Post<'a> {
    zh_cn: PostBody<'a>,
}

#[derive(Serialize)]
struct PostBody<'a> {
    title: &'a str,
    content: Vec<Vec<Segment<'a>>>,
}

#[derive(Serialize)]
#[serde(tag = "tag")]
enum Segment<'a> {
    #[serde(rename = "text")]
    Text { text: &'a str },
    #[serde(rename = "a")]
    Link { text: &'a str, href: &'a str },
}

/// 飞书消息格式
#[derive(Debug, Clone, Default)]
pub struct FeiShuPayload {
    /// 固定标题，不设置时使用本地化标题
    title: Option<String>,
}

impl FeiShuPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl WebhookPayload for FeiShuPayload {
    fn kind(&self) -> &'static str {
        "feishu"
    }

    fn target<'a>(&self, job_info: &'a JobInfo) -> Option<&'a str> {
        job_info.feishu_url.as_deref()
    }

    fn render(&self, summary: &AlarmSummary<'_>) -> serde_json::Result<String> {
        let message = FeiShuMessage {
            msg_type: "post",
            content: PostContent {
                post: Post {
                    zh_cn: PostBody {
                        title: self.title.as_deref().unwrap_or(&summary.title),
                        content: vec![vec![
                            Segment::Text { text: &summary.content },
                            Segment::Link {
                                text: &summary.link_text,
                                href: &summary.link,
                            },
                        ]],
                    },
                },
            },
        };
        serde_json::to_string(&message)
    }
}

/// 飞书渠道
pub type FeiShuChannel = WebhookChannel<FeiShuPayload>;
