//! 具体渠道实现

pub mod dingtalk;
pub mod feishu;
pub mod webhook;

pub use dingtalk::{DingTalkChannel, DingTalkPayload};
pub use feishu::{FeiShuChannel, FeiShuPayload};
pub use webhook::{GenericWebhookChannel, GenericWebhookPayload};
