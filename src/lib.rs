//! Job Alarm - 任务失败告警分发
//!
//! 将任务失败事件转换为清洗、限长后的告警消息，通过连接池化、可重试的
//! HTTP 传输层发送到 webhook（飞书、钉钉、通用 JSON）。

pub mod alarm;
pub mod config;
pub mod content;
pub mod group_store;
pub mod i18n;
pub mod model;
pub mod transport;

pub use alarm::{AlarmChannel, AlarmContext, AlarmError, AlarmerBuilder, JobAlarmer, WebhookChannel, WebhookPayload};
pub use alarm::{DingTalkChannel, FeiShuChannel, GenericWebhookChannel};
pub use config::{AdminConfig, AlarmConfig};
pub use group_store::{GroupStore, MemoryGroupStore};
pub use i18n::{BuiltinLocalizer, Locale, Localizer};
pub use model::{JobGroup, JobInfo, JobLog, SUCCESS_CODE};
pub use transport::{FailureKind, RetryPolicy, Transport, TransportConfig, TransportError};
