//! Job Alarm CLI
//!
//! 手动发送或预览任务失败告警，用于验证 webhook 配置

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use job_alarm::alarm::channels::{DingTalkPayload, FeiShuPayload, GenericWebhookPayload};
use job_alarm::{AlarmConfig, AlarmerBuilder, JobInfo, JobLog, WebhookPayload};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "job-alarm")]
#[command(about = "Job Alarm - 任务失败告警发送工具")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/job-alarm/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 构造一条失败日志并发送到所有已配置的渠道
    Send {
        #[command(flatten)]
        job: JobArgs,
        /// Dry-run 模式（只打印不发送）
        #[arg(long)]
        dry_run: bool,
    },
    /// 打印指定渠道的请求体，不发送
    Render {
        #[command(flatten)]
        job: JobArgs,
        /// 渠道类型
        #[arg(long, value_enum, default_value = "feishu")]
        channel: ChannelKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelKind {
    Feishu,
    Dingtalk,
    Webhook,
}

#[derive(Args)]
struct JobArgs {
    /// 任务 ID
    #[arg(long, default_value = "1")]
    job_id: i64,
    /// 执行器 ID
    #[arg(long, default_value = "1")]
    job_group: i64,
    /// 任务描述
    #[arg(long, default_value = "alarm test")]
    desc: String,
    /// 调度日志 ID
    #[arg(long, default_value = "1")]
    log_id: i64,
    /// 调度信息
    #[arg(long)]
    trigger_msg: Option<String>,
    /// 执行结果码
    #[arg(long, default_value = "500")]
    handle_code: i32,
    /// 执行结果信息
    #[arg(long)]
    handle_msg: Option<String>,
    /// 飞书 webhook 地址
    #[arg(long)]
    feishu_url: Option<String>,
    /// 钉钉 webhook 地址
    #[arg(long)]
    dingtalk_url: Option<String>,
    /// 通用 webhook 地址
    #[arg(long)]
    webhook_url: Option<String>,
}

impl JobArgs {
    fn job_info(&self) -> JobInfo {
        JobInfo {
            id: self.job_id,
            job_group: self.job_group,
            job_desc: self.desc.clone(),
            feishu_url: self.feishu_url.clone(),
            dingtalk_url: self.dingtalk_url.clone(),
            webhook_url: self.webhook_url.clone(),
        }
    }

    fn job_log(&self) -> JobLog {
        JobLog {
            id: self.log_id,
            trigger_msg: self.trigger_msg.clone(),
            handle_code: self.handle_code,
            handle_msg: self.handle_msg.clone(),
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AlarmConfig> {
    match path {
        Some(path) => AlarmConfig::load(path),
        None => AlarmConfig::auto_load(),
    }
}

fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("job_alarm=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Send { job, dry_run } => {
            let alarmer = AlarmerBuilder::new(config).dry_run(dry_run).build()?;
            let results = alarmer.alarm_each(&job.job_info(), &job.job_log());
            for (channel, ok) in &results {
                println!("{}: {}", channel, if *ok { "ok" } else { "failed" });
            }
            if results.iter().any(|(_, ok)| !ok) {
                bail!("alarm delivery failed");
            }
            info!(job_id = job.job_id, log_id = job.log_id, "Alarm dispatched");
        }
        Commands::Render { job, channel } => {
            let mut feishu = FeiShuPayload::new();
            if let Some(title) = &config.feishu_title {
                feishu = feishu.with_title(title.clone());
            }
            let context = AlarmerBuilder::new(config).context();
            let info = job.job_info();
            let log = job.job_log();
            let summary = context.summarize(&info, &log);
            let body = match channel {
                ChannelKind::Feishu => feishu.render(&summary)?,
                ChannelKind::Dingtalk => DingTalkPayload.render(&summary)?,
                ChannelKind::Webhook => GenericWebhookPayload.render(&summary)?,
            };
            let pretty: serde_json::Value = serde_json::from_str(&body)?;
            println!("{}", serde_json::to_string_pretty(&pretty)?);
        }
    }

    Ok(())
}
