//! 告警系统构建器 - 按配置创建共享传输层并注册所有渠道

use super::channel::{AlarmContext, WebhookChannel};
use super::channels::{DingTalkPayload, FeiShuPayload, GenericWebhookPayload};
use super::dispatcher::JobAlarmer;
use crate::config::AlarmConfig;
use crate::group_store::{GroupStore, MemoryGroupStore};
use crate::i18n::{BuiltinLocalizer, Localizer};
use crate::transport::{Transport, TransportError};
use std::sync::Arc;

/// 告警系统构建器
///
/// 所有渠道都会注册，是否发送由任务上对应的目标地址决定。
pub struct AlarmerBuilder {
    config: AlarmConfig,
    dry_run: bool,
    groups: Option<Arc<dyn GroupStore>>,
    localizer: Option<Arc<dyn Localizer>>,
    transport: Option<Arc<Transport>>,
}

impl AlarmerBuilder {
    pub fn new(config: AlarmConfig) -> Self {
        Self {
            config,
            dry_run: false,
            groups: None,
            localizer: None,
            transport: None,
        }
    }

    /// 设置 dry-run 模式
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 使用外部执行器查询（默认使用配置中的执行器列表）
    pub fn group_store(mut self, groups: Arc<dyn GroupStore>) -> Self {
        self.groups = Some(groups);
        self
    }

    /// 使用外部文案（默认按配置语言使用内置文案）
    pub fn localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = Some(localizer);
        self
    }

    /// 复用已有传输层
    pub fn transport(mut self, transport: Arc<Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 渠道共享的上下文
    pub fn context(&self) -> AlarmContext {
        let groups: Arc<dyn GroupStore> = match &self.groups {
            Some(groups) => groups.clone(),
            None => Arc::new(self.config.groups.iter().cloned().collect::<MemoryGroupStore>()),
        };
        let localizer: Arc<dyn Localizer> = match &self.localizer {
            Some(localizer) => localizer.clone(),
            None => Arc::new(BuiltinLocalizer::new(self.config.locale)),
        };
        AlarmContext::new(groups, localizer, self.config.admin())
    }

    pub fn build(self) -> Result<JobAlarmer, TransportError> {
        let transport = match &self.transport {
            Some(transport) => transport.clone(),
            None => Arc::new(Transport::new(self.config.transport.clone())?),
        };
        let context = Arc::new(self.context());

        let mut feishu = FeiShuPayload::new();
        if let Some(title) = &self.config.feishu_title {
            feishu = feishu.with_title(title.clone());
        }

        let mut alarmer = JobAlarmer::new().with_dry_run(self.dry_run);
        alarmer.register_channel(Arc::new(WebhookChannel::new(feishu, transport.clone(), context.clone())));
        alarmer.register_channel(Arc::new(WebhookChannel::new(
            DingTalkPayload,
            transport.clone(),
            context.clone(),
        )));
        alarmer.register_channel(Arc::new(WebhookChannel::new(GenericWebhookPayload, transport, context)));

        Ok(alarmer)
    }
}
