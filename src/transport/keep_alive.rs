//! Keep-Alive 时长策略：响应未声明时默认 60 秒，而不是立即关闭

use reqwest::header::HeaderMap;
use std::time::Duration;

pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct KeepAliveStrategy {
    fallback: Duration,
}

impl Default for KeepAliveStrategy {
    fn default() -> Self {
        Self { fallback: DEFAULT_KEEP_ALIVE }
    }
}

impl KeepAliveStrategy {
    pub fn new(fallback: Duration) -> Self {
        Self { fallback }
    }

    /// 解析 `Keep-Alive: timeout=N[, max=M]`（N 为秒）
    pub fn explicit(headers: &HeaderMap) -> Option<Duration> {
        headers
            .get_all("keep-alive")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter_map(|param| {
                let (name, value) = param.split_once('=')?;
                if !name.trim().eq_ignore_ascii_case("timeout") {
                    return None;
                }
                value.trim().trim_matches('"').parse::<u64>().ok()
            })
            .next()
            .map(Duration::from_secs)
    }

    /// 连接可复用时长
    pub fn duration(&self, headers: &HeaderMap) -> Duration {
        Self::explicit(headers).unwrap_or(self.fallback)
    }
}
