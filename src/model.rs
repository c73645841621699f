//! 告警输入数据：任务、调度日志、执行器

use serde::{Deserialize, Serialize};

/// 执行成功的 handle code
pub const SUCCESS_CODE: i32 = 200;

/// 任务信息快照（每次告警调用时传入，只读）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobInfo {
    /// 任务 ID
    pub id: i64,
    /// 所属执行器 ID
    pub job_group: i64,
    /// 任务描述
    pub job_desc: String,
    /// 飞书机器人 webhook 地址
    #[serde(default)]
    pub feishu_url: Option<String>,
    /// 钉钉机器人 webhook 地址
    #[serde(default)]
    pub dingtalk_url: Option<String>,
    /// 通用 webhook 地址
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl JobInfo {
    pub fn new(id: i64, job_group: i64, job_desc: impl Into<String>) -> Self {
        Self {
            id,
            job_group,
            job_desc: job_desc.into(),
            ..Default::default()
        }
    }

    pub fn with_feishu_url(mut self, url: impl Into<String>) -> Self {
        self.feishu_url = Some(url.into());
        self
    }

    pub fn with_dingtalk_url(mut self, url: impl Into<String>) -> Self {
        self.dingtalk_url = Some(url.into());
        self
    }

    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }
}

/// 调度日志
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobLog {
    /// 日志 ID
    pub id: i64,
    /// 调度信息
    #[serde(default)]
    pub trigger_msg: Option<String>,
    /// 执行结果码，<= 0 表示未回调
    #[serde(default)]
    pub handle_code: i32,
    /// 执行结果信息
    #[serde(default)]
    pub handle_msg: Option<String>,
}

impl JobLog {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_trigger_msg(mut self, msg: impl Into<String>) -> Self {
        self.trigger_msg = Some(msg.into());
        self
    }

    pub fn with_handle(mut self, code: i32, msg: impl Into<String>) -> Self {
        self.handle_code = code;
        self.handle_msg = Some(msg.into());
        self
    }

    /// 执行结果是否为失败（已回调且非成功码）
    pub fn handle_failed(&self) -> bool {
        self.handle_code > 0 && self.handle_code != SUCCESS_CODE
    }
}

/// 执行器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobGroup {
    pub id: i64,
    pub title: String,
}
