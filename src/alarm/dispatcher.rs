//! 告警分发器 - 管理多个渠道并依次发送

use super::channel::AlarmChannel;
use crate::model::{JobInfo, JobLog};
use std::sync::Arc;
use tracing::{info, warn};

/// 告警分发器
///
/// 每个渠道独立判断自己是否配置了目标，分发器只负责依次调用并汇总结果。
pub struct JobAlarmer {
    /// 所有注册的渠道
    channels: Vec<Arc<dyn AlarmChannel>>,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl JobAlarmer {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 注册渠道
    pub fn register_channel(&mut self, channel: Arc<dyn AlarmChannel>) {
        info!(channel = channel.name(), "Registering alarm channel");
        self.channels.push(channel);
    }

    /// 发送告警到所有渠道，全部成功（或未配置）时返回 true
    pub fn alarm(&self, job_info: &JobInfo, job_log: &JobLog) -> bool {
        self.alarm_each(job_info, job_log)
            .into_iter()
            .fold(true, |all, (_, ok)| all && ok)
    }

    /// 发送告警到所有渠道，返回每个渠道的结果
    pub fn alarm_each(&self, job_info: &JobInfo, job_log: &JobLog) -> Vec<(String, bool)> {
        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let name = channel.name().to_string();

            if self.dry_run {
                info!(channel = %name, job_id = job_info.id, job_log_id = job_log.id, "[DRY-RUN] Would send alarm");
                results.push((name, true));
                continue;
            }

            let ok = channel.do_alarm(job_info, job_log);
            if !ok {
                warn!(channel = %name, job_log_id = job_log.id, "Alarm channel failed");
            }
            results.push((name, ok));
        }

        results
    }

    /// 获取已注册的渠道数量
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// 获取已注册的渠道名称
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }
}

impl Default for JobAlarmer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 测试用的 mock 渠道
    struct MockChannel {
        name: String,
        outcome: bool,
        send_count: AtomicUsize,
    }

    impl MockChannel {
        fn new(name: &str, outcome: bool) -> Self {
            Self {
                name: name.to_string(),
                outcome,
                send_count: AtomicUsize::new(0),
            }
        }

        fn get_send_count(&self) -> usize {
            self.send_count.load(Ordering::SeqCst)
        }
    }

    impl AlarmChannel for MockChannel {
        fn name(&self) -> &str {
            &self.name
        }

        fn do_alarm(&self, _job_info: &JobInfo, _job_log: &JobLog) -> bool {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            self.outcome
        }
    }

    fn job() -> (JobInfo, JobLog) {
        (JobInfo::new(1, 1, "desc"), JobLog::new(10))
    }

    #[test]
    fn test_register_channel() {
        let mut alarmer = JobAlarmer::new();
        assert_eq!(alarmer.channel_count(), 0);

        alarmer.register_channel(Arc::new(MockChannel::new("test", true)));
        assert_eq!(alarmer.channel_count(), 1);
        assert_eq!(alarmer.channel_names(), vec!["test"]);
    }

    #[test]
    fn test_no_channels_is_success() {
        let (info, log) = job();
        assert!(JobAlarmer::new().alarm(&info, &log));
    }

    #[test]
    fn test_all_channels_invoked_and_results_combined() {
        let mut alarmer = JobAlarmer::new();
        let ok = Arc::new(MockChannel::new("ok", true));
        let failing = Arc::new(MockChannel::new("failing", false));
        let after = Arc::new(MockChannel::new("after", true));
        alarmer.register_channel(ok.clone());
        alarmer.register_channel(failing.clone());
        alarmer.register_channel(after.clone());

        let (info, log) = job();
        assert!(!alarmer.alarm(&info, &log));

        // 一个渠道失败不影响后续渠道
        assert_eq!(ok.get_send_count(), 1);
        assert_eq!(failing.get_send_count(), 1);
        assert_eq!(after.get_send_count(), 1);

        let results = alarmer.alarm_each(&info, &log);
        assert_eq!(
            results,
            vec![
                ("ok".to_string(), true),
                ("failing".to_string(), false),
                ("after".to_string(), true)
            ]
        );
    }

    #[test]
    fn test_dry_run() {
        let mut alarmer = JobAlarmer::new().with_dry_run(true);
        let channel = Arc::new(MockChannel::new("test", false));
        alarmer.register_channel(channel.clone());

        let (info, log) = job();
        assert!(alarmer.alarm(&info, &log));
        assert_eq!(channel.get_send_count(), 0); // 不应该实际发送
    }
}
