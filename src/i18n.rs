//! 告警文案国际化

use serde::{Deserialize, Serialize};

/// 文案查找
pub trait Localizer: Send + Sync {
    /// 按 key 查找文案，找不到时返回 key 本身
    fn get(&self, key: &str) -> String;
}

/// 支持的语言
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "zh_CN")]
    ZhCn,
    #[serde(rename = "en")]
    En,
}

/// Message keys
pub mod keys {
    pub const ALARM_TYPE: &str = "jobconf_monitor_alarm_type";
    pub const ALARM_TITLE: &str = "jobconf_monitor_alarm_title";
    pub const ALARM_CONTENT: &str = "jobconf_monitor_alarm_content";
    pub const JOB_GROUP: &str = "jobinfo_field_jobgroup";
    pub const JOB_ID: &str = "jobinfo_field_id";
    pub const JOB_DESC: &str = "jobinfo_field_jobdesc";
    pub const MESSAGE_TITLE: &str = "alarm_title";
    pub const DETAIL_LINK: &str = "alarm_detail_link";
}

const ZH_CN: &[(&str, &str)] = &[
    (keys::ALARM_TYPE, "调度失败"),
    (keys::ALARM_TITLE, "告警类型"),
    (keys::ALARM_CONTENT, "告警内容"),
    (keys::JOB_GROUP, "执行器"),
    (keys::JOB_ID, "任务id"),
    (keys::JOB_DESC, "任务描述"),
    (keys::MESSAGE_TITLE, "XXL-JOB报警"),
    (keys::DETAIL_LINK, "详情"),
];

const EN: &[(&str, &str)] = &[
    (keys::ALARM_TYPE, "Trigger Fail"),
    (keys::ALARM_TITLE, "Alarm Type"),
    (keys::ALARM_CONTENT, "Alarm Content"),
    (keys::JOB_GROUP, "Executor"),
    (keys::JOB_ID, "Job ID"),
    (keys::JOB_DESC, "Job Desc"),
    (keys::MESSAGE_TITLE, "XXL-JOB Alarm"),
    (keys::DETAIL_LINK, "Detail"),
];

/// 内置文案表
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLocalizer {
    locale: Locale,
}

impl BuiltinLocalizer {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    fn table(&self) -> &'static [(&'static str, &'static str)] {
        match self.locale {
            Locale::ZhCn => ZH_CN,
            Locale::En => EN,
        }
    }
}

impl Localizer for BuiltinLocalizer {
    fn get(&self, key: &str) -> String {
        self.table()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let zh = BuiltinLocalizer::default();
        assert_eq!(zh.get(keys::JOB_GROUP), "执行器");
        assert_eq!(zh.get(keys::DETAIL_LINK), "详情");

        let en = BuiltinLocalizer::new(Locale::En);
        assert_eq!(en.get(keys::ALARM_CONTENT), "Alarm Content");
    }

    #[test]
    fn test_unknown_key_echoes() {
        let zh = BuiltinLocalizer::default();
        assert_eq!(zh.get("no_such_key"), "no_such_key");
    }

    #[test]
    fn test_tables_cover_same_keys() {
        for (key, _) in ZH_CN {
            assert!(EN.iter().any(|(k, _)| k == key), "missing en entry for {}", key);
        }
    }

    #[test]
    fn test_locale_serde_names() {
        assert_eq!(serde_json::to_string(&Locale::ZhCn).unwrap(), "\"zh_CN\"");
        let en: Locale = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(en, Locale::En);
    }
}
