//! 请求失败分类与重试判定
//!
//! 底层错误先归到一个封闭的 [`FailureKind`] 集合，再查表得到 [`Retryability`]。

use std::error::Error as StdError;
use std::io;

/// 请求失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// 服务端丢弃了连接（未返回响应）
    ConnectionReset,
    /// TLS 握手失败
    HandshakeFailure,
    /// 读写或连接超时
    Timeout,
    /// 域名解析失败
    DnsFailure,
    /// 连接被拒绝
    ConnectRefused,
    /// 其他 TLS 错误
    TlsError,
    /// 其他
    Other,
}

/// 重试资格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    Always,
    Never,
    /// 仅当请求不带 body 时重试
    IdempotentOnly,
}

impl FailureKind {
    pub const ALL: [FailureKind; 7] = [
        FailureKind::ConnectionReset,
        FailureKind::HandshakeFailure,
        FailureKind::Timeout,
        FailureKind::DnsFailure,
        FailureKind::ConnectRefused,
        FailureKind::TlsError,
        FailureKind::Other,
    ];

    pub fn retryability(self) -> Retryability {
        match self {
            FailureKind::ConnectionReset => Retryability::Always,
            FailureKind::HandshakeFailure
            | FailureKind::Timeout
            | FailureKind::DnsFailure
            | FailureKind::ConnectRefused
            | FailureKind::TlsError => Retryability::Never,
            FailureKind::Other => Retryability::IdempotentOnly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ConnectionReset => "connection-reset",
            FailureKind::HandshakeFailure => "handshake-failure",
            FailureKind::Timeout => "timeout",
            FailureKind::DnsFailure => "dns-failure",
            FailureKind::ConnectRefused => "connect-refused",
            FailureKind::TlsError => "tls-error",
            FailureKind::Other => "other",
        }
    }

    /// 分类 reqwest 错误
    ///
    /// 最外层的信息里带着请求 URL，只从 source 开始分类。
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return FailureKind::Timeout;
        }
        match err.source() {
            Some(source) => Self::from_error(source),
            None => FailureKind::Other,
        }
    }

    /// 沿 source 链分类：先看 io::ErrorKind，再从最底层开始匹配错误信息
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut chain: Vec<&(dyn StdError + 'static)> = Vec::new();
        let mut current = Some(err);
        while let Some(e) = current {
            chain.push(e);
            current = e.source();
        }

        // 外层信息更笼统，从最底层开始匹配
        chain
            .iter()
            .find_map(|e| e.downcast_ref::<io::Error>().and_then(Self::from_io_kind))
            .or_else(|| chain.iter().rev().find_map(|e| Self::from_message(&e.to_string())))
            .unwrap_or(FailureKind::Other)
    }

    fn from_io_kind(err: &io::Error) -> Option<Self> {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Some(FailureKind::ConnectRefused),
            io::ErrorKind::TimedOut => Some(FailureKind::Timeout),
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Some(FailureKind::ConnectionReset),
            _ => None,
        }
    }

    fn from_message(message: &str) -> Option<Self> {
        let message = message.to_lowercase();
        let has = |needle: &str| message.contains(needle);

        if has("connection closed before message completed") || has("incomplete message") {
            Some(FailureKind::ConnectionReset)
        } else if has("dns error")
            || has("failed to lookup address")
            || has("name or service not known")
            || has("no such host")
        {
            Some(FailureKind::DnsFailure)
        } else if has("handshake") {
            Some(FailureKind::HandshakeFailure)
        } else if has("certificate") || has("tls") || has("ssl") {
            Some(FailureKind::TlsError)
        } else if has("timed out") {
            Some(FailureKind::Timeout)
        } else if has("connection refused") {
            Some(FailureKind::ConnectRefused)
        } else {
            None
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 重试策略
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1) }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempts` 为已执行次数（含本次失败）
    pub fn should_retry(&self, kind: FailureKind, attempts: u32, has_body: bool) -> bool {
        if attempts >= self.max_attempts {
            return false;
        }
        match kind.retryability() {
            Retryability::Always => true,
            Retryability::Never => false,
            Retryability::IdempotentOnly => !has_body,
        }
    }
}
