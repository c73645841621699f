//! 任务失败告警
//!
//! - `AlarmChannel`：每种通知目标一个实现，统一返回 bool，不向调用方抛错
//! - `WebhookChannel`：按 `WebhookPayload` 渲染消息并经共享 `Transport` 发送
//! - `JobAlarmer`：依次调用所有渠道，汇总结果
//!
//! # 使用示例
//! ```ignore
//! use job_alarm::{AlarmConfig, AlarmerBuilder, JobInfo, JobLog};
//!
//! let alarmer = AlarmerBuilder::new(AlarmConfig::auto_load()?).build()?;
//! let info = JobInfo::new(1, 1, "demo").with_feishu_url("https://open.feishu.cn/open-apis/bot/v2/hook/xxx");
//! alarmer.alarm(&info, &JobLog::new(42).with_handle(500, "boom"));
//! ```

pub mod builder;
pub mod channel;
pub mod channels;
pub mod dispatcher;

pub use builder::AlarmerBuilder;
pub use channel::{AlarmChannel, AlarmContext, AlarmError, AlarmSummary, WebhookChannel, WebhookPayload};
pub use channels::{DingTalkChannel, FeiShuChannel, GenericWebhookChannel};
pub use dispatcher::JobAlarmer;
