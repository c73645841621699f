//! 告警 HTTP 传输层
//!
//! 所有渠道共享一个 [`Transport`]：
//! - 连接池：总连接 800，单路由 100，连接最长存活 15 秒，后台定期清理过期连接
//! - 读超时 10 秒
//! - 最多执行 3 次，仅对可重试的失败立即重试（无退避）
//! - 响应未声明 keep-alive 时按 60 秒复用
//!
//! 对外是同步阻塞接口，内部用一个小的 tokio runtime 驱动 reqwest。

pub mod keep_alive;
pub mod pool;
pub mod retry;

pub use keep_alive::KeepAliveStrategy;
pub use pool::{CheckoutError, ConnectionPool, Lease, PoolConfig, PoolStats, Route};
pub use retry::{FailureKind, RetryPolicy, Retryability};

use reqwest::header::{HeaderMap, CONNECTION, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 传输层配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// 单次请求超时（毫秒）
    pub read_timeout_ms: u64,
    /// 建连超时（毫秒），不设置则只受 read_timeout 约束
    pub connect_timeout_ms: Option<u64>,
    /// 连接池总连接数上限
    pub max_total: usize,
    /// 单路由连接数上限
    pub max_per_route: usize,
    /// 连接最长存活时间（毫秒）
    pub time_to_live_ms: u64,
    /// 响应未声明 keep-alive 时的复用时长（毫秒）
    pub keep_alive_fallback_ms: u64,
    /// 是否后台清理过期连接
    pub evict_idle: bool,
    /// 清理间隔（毫秒）
    pub eviction_interval_ms: u64,
    /// 等待可用连接的最长时间（毫秒）
    pub checkout_timeout_ms: u64,
    /// 最大执行次数（含首次）
    pub max_attempts: u32,
    /// 是否使用系统代理（HTTP_PROXY 等环境变量）
    pub use_system_proxy: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 10_000,
            connect_timeout_ms: None,
            max_total: 800,
            max_per_route: 100,
            time_to_live_ms: 15_000,
            keep_alive_fallback_ms: 60_000,
            evict_idle: true,
            eviction_interval_ms: 10_000,
            checkout_timeout_ms: 10_000,
            max_attempts: 3,
            use_system_proxy: true,
        }
    }
}

impl TransportConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_total: self.max_total.max(1),
            max_per_route: self.max_per_route.max(1),
            time_to_live: Duration::from_millis(self.time_to_live_ms),
            checkout_timeout: Duration::from_millis(self.checkout_timeout_ms),
        }
    }
}

/// 传输层错误
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed ({kind}) after {attempts} attempt(s): {source}")]
    Request {
        kind: FailureKind,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected http status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("timed out waiting for a pooled connection to {route}")]
    PoolTimeout { route: Route },

    #[error("failed to start transport runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl TransportError {
    /// 网络失败类型（仅 Request 错误有）
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            TransportError::Request { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// 已执行次数（仅 Request 错误有）
    pub fn attempts(&self) -> Option<u32> {
        match self {
            TransportError::Request { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Reply {
    fn wants_close(&self) -> bool {
        self.headers
            .get(CONNECTION)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v.eq_ignore_ascii_case("close"))
    }
}

/// 共享的连接池化 HTTP 客户端
pub struct Transport {
    config: TransportConfig,
    pool: Arc<ConnectionPool<reqwest::Client>>,
    retry: RetryPolicy,
    keep_alive: KeepAliveStrategy,
    /// 只在 drop 时取出
    runtime: Option<tokio::runtime::Runtime>,
}

impl Transport {
    /// 创建传输层
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("alarm-transport")
            .enable_all()
            .build()
            .map_err(TransportError::Runtime)?;

        let pool = Arc::new(ConnectionPool::new(config.pool_config()));
        if config.evict_idle {
            let period = Duration::from_millis(config.eviction_interval_ms.max(1));
            runtime.spawn(evict_periodically(Arc::downgrade(&pool), period));
        }

        info!(
            max_total = config.max_total,
            max_per_route = config.max_per_route,
            read_timeout_ms = config.read_timeout_ms,
            max_attempts = config.max_attempts,
            "Alarm transport initialized"
        );

        Ok(Self {
            retry: RetryPolicy::new(config.max_attempts),
            keep_alive: KeepAliveStrategy::new(Duration::from_millis(config.keep_alive_fallback_ms)),
            config,
            pool,
            runtime: Some(runtime),
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn runtime(&self) -> &tokio::runtime::Runtime {
        match &self.runtime {
            Some(runtime) => runtime,
            None => unreachable!("transport used after drop"),
        }
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// POST JSON 文本，返回原始响应体
    pub fn post(&self, url: &str, body: impl Into<String>) -> Result<String, TransportError> {
        self.execute(Method::POST, url, Some(body.into()))
    }

    /// GET，返回原始响应体
    pub fn get(&self, url: &str) -> Result<String, TransportError> {
        self.execute(Method::GET, url, None)
    }

    fn execute(&self, method: Method, url: &str, body: Option<String>) -> Result<String, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let route = Route::from_url(&parsed).ok_or_else(|| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        })?;
        let has_body = body.is_some();

        let mut attempts = 0;
        loop {
            attempts += 1;

            let lease = self.checkout(&route)?;
            let mut request = lease.connection().request(method.clone(), parsed.clone());
            if let Some(body) = &body {
                request = request
                    .header(CONTENT_TYPE, "application/json; charset=utf-8")
                    .body(body.clone());
            }

            debug!(route = %route, method = %method, attempt = attempts, reused = lease.is_reused(), "Sending request");

            match self.block_on(send(request)) {
                Ok(reply) => {
                    if reply.wants_close() {
                        drop(lease);
                    } else {
                        lease.release(self.keep_alive.duration(&reply.headers));
                    }

                    if !reply.status.is_success() {
                        return Err(TransportError::Status {
                            status: reply.status,
                            body: reply.body,
                        });
                    }
                    if attempts > 1 {
                        info!(route = %route, attempts, "Request succeeded after retry");
                    }
                    return Ok(reply.body);
                }
                Err(err) => {
                    drop(lease);
                    let kind = FailureKind::classify(&err);
                    if self.retry.should_retry(kind, attempts, has_body) {
                        warn!(route = %route, attempt = attempts, kind = %kind, error = %err, "Request failed, retrying");
                        continue;
                    }
                    return Err(TransportError::Request {
                        kind,
                        attempts,
                        source: err,
                    });
                }
            }
        }
    }

    fn checkout(&self, route: &Route) -> Result<Lease<'_, reqwest::Client>, TransportError> {
        self.pool
            .checkout(route, || {
                let _enter = self.runtime().enter();
                self.build_client()
            })
            .map_err(|e| match e {
                CheckoutError::Timeout => TransportError::PoolTimeout { route: route.clone() },
                CheckoutError::Connect(e) => TransportError::Client(e),
            })
    }

    /// 每个池化连接对应一个只持有单条 socket 的 reqwest 客户端，
    /// 存活期限由连接池管理
    fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.config.read_timeout())
            .pool_max_idle_per_host(1)
            .pool_idle_timeout(None)
            .user_agent(concat!("job-alarm/", env!("CARGO_PKG_VERSION")));
        if let Some(ms) = self.config.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if !self.config.use_system_proxy {
            builder = builder.no_proxy();
        }
        builder.build()
    }

    /// 在内部 runtime 上阻塞执行；调用方已处于 tokio 上下文时换到独立线程执行
    fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send,
        F::Output: Send,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            return self.runtime().block_on(future);
        }
        std::thread::scope(|s| {
            s.spawn(|| self.runtime().block_on(future))
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        })
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        // 可能在调用方的 async 上下文中析构，不能阻塞等待 runtime 退出
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

async fn send(request: reqwest::RequestBuilder) -> reqwest::Result<Reply> {
    let response = request.send().await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await?;
    Ok(Reply { status, headers, body })
}

async fn evict_periodically(pool: Weak<ConnectionPool<reqwest::Client>>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match pool.upgrade() {
            Some(pool) => {
                pool.evict_expired();
            }
            None => break,
        }
    }
}
