//! 告警渠道 trait 与通用 webhook 渠道实现

use crate::config::AdminConfig;
use crate::content;
use crate::group_store::GroupStore;
use crate::i18n::{keys, Localizer};
use crate::model::{JobInfo, JobLog};
use crate::transport::{Transport, TransportError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// 告警渠道
pub trait AlarmChannel: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 发送任务失败告警
    ///
    /// 未配置目标地址时视为成功；任何失败都只记录日志并返回 false。
    fn do_alarm(&self, job_info: &JobInfo, job_log: &JobLog) -> bool;
}

/// 告警发送失败
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to render alarm payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// 渠道共享的外部依赖
pub struct AlarmContext {
    pub groups: Arc<dyn GroupStore>,
    pub localizer: Arc<dyn Localizer>,
    pub admin: AdminConfig,
}

impl AlarmContext {
    pub fn new(groups: Arc<dyn GroupStore>, localizer: Arc<dyn Localizer>, admin: AdminConfig) -> Self {
        Self { groups, localizer, admin }
    }

    /// 组装本次告警的摘要（每次调用独立生成）
    pub fn summarize<'a>(&self, job_info: &'a JobInfo, job_log: &'a JobLog) -> AlarmSummary<'a> {
        let group_title = self.groups.load(job_info.job_group).map(|g| g.title);
        let content = content::build(job_info, job_log, group_title.as_deref(), self.localizer.as_ref());

        AlarmSummary {
            job_info,
            job_log,
            group_title,
            content,
            link: self.admin.job_log_url(job_info.id),
            title: self.localizer.get(keys::MESSAGE_TITLE),
            link_text: self.localizer.get(keys::DETAIL_LINK),
        }
    }
}

/// 单次告警的渲染输入
#[derive(Debug, Clone)]
pub struct AlarmSummary<'a> {
    pub job_info: &'a JobInfo,
    pub job_log: &'a JobLog,
    /// 执行器名称（查询失败为 None）
    pub group_title: Option<String>,
    /// 清洗截断后的告警摘要
    pub content: String,
    /// 调度日志页面链接
    pub link: String,
    /// 消息标题
    pub title: String,
    /// 链接文字
    pub link_text: String,
}

/// Webhook 消息格式
pub trait WebhookPayload: Send + Sync {
    /// 渠道类型
    fn kind(&self) -> &'static str;

    /// 从任务配置中取目标地址
    fn target<'a>(&self, job_info: &'a JobInfo) -> Option<&'a str>;

    /// 渲染请求体
    fn render(&self, summary: &AlarmSummary<'_>) -> serde_json::Result<String>;
}

/// 基于 webhook 的告警渠道
pub struct WebhookChannel<P> {
    payload: P,
    transport: Arc<Transport>,
    context: Arc<AlarmContext>,
}

impl<P: WebhookPayload> WebhookChannel<P> {
    pub fn new(payload: P, transport: Arc<Transport>, context: Arc<AlarmContext>) -> Self {
        Self {
            payload,
            transport,
            context,
        }
    }

    /// 渲染请求体（不发送）
    pub fn render(&self, job_info: &JobInfo, job_log: &JobLog) -> Result<String, AlarmError> {
        let summary = self.context.summarize(job_info, job_log);
        Ok(self.payload.render(&summary)?)
    }

    fn deliver(&self, url: &str, job_info: &JobInfo, job_log: &JobLog) -> Result<String, AlarmError> {
        let body = self.render(job_info, job_log)?;
        Ok(self.transport.post(url, body)?)
    }
}

impl<P: WebhookPayload> AlarmChannel for WebhookChannel<P> {
    fn name(&self) -> &str {
        self.payload.kind()
    }

    fn do_alarm(&self, job_info: &JobInfo, job_log: &JobLog) -> bool {
        let Some(url) = self
            .payload
            .target(job_info)
            .map(str::trim)
            .filter(|url| !url.is_empty())
        else {
            debug!(channel = self.name(), job_id = job_info.id, "Alarm target not configured, skipped");
            return true;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.deliver(url, job_info, job_log)));
        match outcome {
            Ok(Ok(response)) => {
                info!(
                    channel = self.name(),
                    job_log_id = job_log.id,
                    response = %response,
                    "Job fail alarm sent"
                );
                true
            }
            Ok(Err(e)) => {
                error!(
                    channel = self.name(),
                    job_log_id = job_log.id,
                    error = %e,
                    "Job fail alarm send error"
                );
                false
            }
            Err(_) => {
                error!(
                    channel = self.name(),
                    job_log_id = job_log.id,
                    "Job fail alarm panicked"
                );
                false
            }
        }
    }
}
