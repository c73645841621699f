//! 钉钉机器人渠道（markdown 消息）

use crate::alarm::channel::{AlarmSummary, WebhookChannel, WebhookPayload};
use crate::model::JobInfo;
use serde::Serialize;

#[derive(Serialize)]
struct DingTalkMessage<'a> {
    msgtype: &'static str,
    markdown: Markdown<'a>,
}

#[derive(Serialize)]
struct Markdown<'a> {
    title: &'a str,
    text: String,
}

/// 钉钉消息格式
#[derive(Debug, Clone, Copy, Default)]
pub struct DingTalkPayload;

impl WebhookPayload for DingTalkPayload {
    fn kind(&self) -> &'static str {
        "dingtalk"
    }

    fn target<'a>(&self, job_info: &'a JobInfo) -> Option<&'a str> {
        job_info.dingtalk_url.as_deref()
    }

    fn render(&self, summary: &AlarmSummary<'_>) -> serde_json::Result<String> {
        let message = DingTalkMessage {
            msgtype: "markdown",
            markdown: Markdown {
                title: &summary.title,
                text: format!(
                    "#### {}\n\n{}\n\n[{}]({})",
                    summary.title, summary.content, summary.link_text, summary.link
                ),
            },
        };
        serde_json::to_string(&message)
    }
}

/// 钉钉渠道
pub type DingTalkChannel = WebhookChannel<DingTalkPayload>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobLog;

    #[test]
    fn test_render_markdown() {
        let info = JobInfo::new(5, 1, "desc");
        let log = JobLog::new(9);
        let summary = AlarmSummary {
            job_info: &info,
            job_log: &log,
            group_title: None,
            content: "执行器:null 任务id:5".to_string(),
            link: "http://admin/joblog?jobId=5".to_string(),
            title: "XXL-JOB报警".to_string(),
            link_text: "详情".to_string(),
        };

        let body = DingTalkPayload.render(&summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(value["msgtype"], "markdown");
        assert_eq!(value["markdown"]["title"], "XXL-JOB报警");
        assert_eq!(
            value["markdown"]["text"],
            "#### XXL-JOB报警\n\n执行器:null 任务id:5\n\n[详情](http://admin/joblog?jobId=5)"
        );
    }
}
