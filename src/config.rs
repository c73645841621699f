//! 告警配置加载
//!
//! 默认路径 `~/.config/job-alarm/config.json`（按平台的 config 目录），
//! 所有字段都有默认值，文件中只需写需要覆盖的部分。

use crate::i18n::Locale;
use crate::model::JobGroup;
use crate::transport::TransportConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 调度中心地址默认值
const DEFAULT_ADMIN_URL: &str = "http://127.0.0.1:8080/xxl-job-admin";

/// 告警配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// 调度中心访问地址（用于拼接日志详情链接）
    pub admin_url: String,
    /// 告警文案语言
    pub locale: Locale,
    /// 飞书消息标题，不设置时使用本地化标题
    pub feishu_title: Option<String>,
    /// 执行器列表
    pub groups: Vec<JobGroup>,
    /// 传输层配置
    pub transport: TransportConfig,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            admin_url: DEFAULT_ADMIN_URL.to_string(),
            locale: Locale::default(),
            feishu_title: None,
            groups: Vec::new(),
            transport: TransportConfig::default(),
        }
    }
}

impl AlarmConfig {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read alarm config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse alarm config {}", path.display()))?;
        debug!(path = %path.display(), groups = config.groups.len(), "Loaded alarm config");
        Ok(config)
    }

    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("job-alarm").join("config.json"))
    }

    /// 加载默认路径的配置，文件不存在时使用默认值
    pub fn auto_load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn admin(&self) -> AdminConfig {
        AdminConfig::new(&self.admin_url)
    }
}

/// 调度中心地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    base_url: String,
}

impl AdminConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 任务调度日志页面链接
    pub fn job_log_url(&self, job_id: i64) -> String {
        format!("{}/joblog?jobId={}", self.base_url, job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_job_log_url() {
        let admin = AdminConfig::new("http://admin.example.com/xxl-job-admin/");
        assert_eq!(admin.base_url(), "http://admin.example.com/xxl-job-admin");
        assert_eq!(
            admin.job_log_url(12),
            "http://admin.example.com/xxl-job-admin/joblog?jobId=12"
        );
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "admin_url": "http://admin:8080/xxl-job-admin",
                "locale": "en",
                "groups": [{{"id": 1, "title": "demo-executor"}}],
                "transport": {{"max_total": 10}}
            }}"#
        )
        .unwrap();

        let config = AlarmConfig::load(file.path()).unwrap();
        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.groups.len(), 1);
        assert_eq!(config.transport.max_total, 10);
        assert_eq!(config.transport.max_per_route, 100);
        assert!(config.feishu_title.is_none());
    }

    #[test]
    fn test_load_invalid_json_has_context() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = AlarmConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse alarm config"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AlarmConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read alarm config"));
    }

    #[test]
    fn test_default_config() {
        let config = AlarmConfig::default();
        assert_eq!(config.admin().base_url(), DEFAULT_ADMIN_URL);
        assert_eq!(config.locale, Locale::ZhCn);
    }
}
