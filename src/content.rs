//! 告警内容构建 - 清洗并截断为可嵌入 JSON 字符串的单行文本
//!
//! 处理顺序：
//! 1. 拼接 LogId / TriggerMsg / HandleCode
//! 2. 去除换行、制表、回车，双引号替换为单引号，`<br>` 替换为空格
//! 3. 截断到 500 个字符（按 Unicode 标量计数，不会切断多字节字符）
//! 4. 拼接执行器、任务 ID、任务描述、告警类型，整体再清洗截断一次

use crate::i18n::{keys, Localizer};
use crate::model::{JobInfo, JobLog};

/// 告警内容最大字符数
pub const MAX_CONTENT_CHARS: usize = 500;

/// 执行器查询失败时的占位名
pub const GROUP_PLACEHOLDER: &str = "null";

/// 清洗文本：去掉 `\n` `\t` `\r`，`"` 替换为 `'`，`<br>` 替换为空格
pub fn sanitize(text: &str) -> String {
    text.replace("<br>", " ")
        .chars()
        .filter(|c| !matches!(c, '\n' | '\t' | '\r'))
        .map(|c| if c == '"' { '\'' } else { c })
        .collect()
}

/// 截取前 `max` 个字符，不足则原样返回
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn is_blank(text: Option<&str>) -> bool {
    text.map_or(true, |s| s.trim().is_empty())
}

/// 告警明细（日志 ID、调度信息、执行结果）
pub fn alarm_detail(job_log: &JobLog) -> String {
    let mut detail = format!("Alarm Job LogId={}", job_log.id);

    if !is_blank(job_log.trigger_msg.as_deref()) {
        detail.push_str(" TriggerMsg= ");
        detail.push_str(job_log.trigger_msg.as_deref().unwrap_or_default());
    }
    if job_log.handle_failed() {
        detail.push_str(" HandleCode=");
        detail.push_str(job_log.handle_msg.as_deref().unwrap_or("null"));
    }

    let cleaned = sanitize(&detail);
    truncate_chars(&cleaned, MAX_CONTENT_CHARS).to_string()
}

/// 拼接完整告警摘要
pub fn build(
    job_info: &JobInfo,
    job_log: &JobLog,
    group_title: Option<&str>,
    localizer: &dyn Localizer,
) -> String {
    let detail = alarm_detail(job_log);
    let group = group_title.unwrap_or(GROUP_PLACEHOLDER);

    let summary = format!(
        "{}:{} {}:{} {}:{} {}:{} {}:{}",
        localizer.get(keys::JOB_GROUP),
        group,
        localizer.get(keys::JOB_ID),
        job_info.id,
        localizer.get(keys::JOB_DESC),
        job_info.job_desc,
        localizer.get(keys::ALARM_TITLE),
        localizer.get(keys::ALARM_TYPE),
        localizer.get(keys::ALARM_CONTENT),
        detail,
    );

    // 任务描述和执行器名来自用户输入，整体再清洗一次
    let cleaned = sanitize(&summary);
    truncate_chars(&cleaned, MAX_CONTENT_CHARS).to_string()
}
