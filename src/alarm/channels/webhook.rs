//! 通用 webhook 渠道：POST 结构化 JSON，由接收方自行处理

use crate::alarm::channel::{AlarmSummary, WebhookChannel, WebhookPayload};
use crate::model::JobInfo;
use serde::Serialize;

#[derive(Serialize)]
struct GenericAlarm<'a> {
    title: &'a str,
    job_id: i64,
    job_group: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_title: Option<&'a str>,
    job_desc: &'a str,
    job_log_id: i64,
    handle_code: i32,
    content: &'a str,
    link: &'a str,
}

/// 通用 JSON 消息格式
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericWebhookPayload;

impl WebhookPayload for GenericWebhookPayload {
    fn kind(&self) -> &'static str {
        "webhook"
    }

    fn target<'a>(&self, job_info: &'a JobInfo) -> Option<&'a str> {
        job_info.webhook_url.as_deref()
    }

    fn render(&self, summary: &AlarmSummary<'_>) -> serde_json::Result<String> {
        serde_json::to_string(&GenericAlarm {
            title: &summary.title,
            job_id: summary.job_info.id,
            job_group: summary.job_info.job_group,
            group_title: summary.group_title.as_deref(),
            job_desc: &summary.job_info.job_desc,
            job_log_id: summary.job_log.id,
            handle_code: summary.job_log.handle_code,
            content: &summary.content,
            link: &summary.link,
        })
    }
}

/// 通用 webhook 渠道
pub type GenericWebhookChannel = WebhookChannel<GenericWebhookPayload>;
