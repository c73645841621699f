//! 连接池 - 按路由（scheme://host:port）限制连接数
//!
//! - 总连接数（空闲 + 租出）不超过 `max_total`
//! - 单路由连接数不超过 `max_per_route`
//! - 连接最长存活 `time_to_live`，归还时按 keep-alive 缩短可复用期限
//! - 总数已满时，优先关闭其他路由的空闲连接腾出名额
//!
//! 连接类型是泛型参数，租约（[`Lease`]）析构时默认丢弃连接，
//! 只有显式 [`Lease::release`] 才放回池中。

use reqwest::Url;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 连接池路由
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route(String);

impl Route {
    pub fn new(scheme: &str, host: &str, port: u16) -> Self {
        Self(format!("{}://{}:{}", scheme, host.to_lowercase(), port))
    }

    pub fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Self::new(url.scheme(), host, port))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 连接池配置
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_total: usize,
    pub max_per_route: usize,
    pub time_to_live: Duration,
    /// 等待可用连接的最长时间
    pub checkout_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_total: 800,
            max_per_route: 100,
            time_to_live: Duration::from_secs(15),
            checkout_timeout: Duration::from_secs(10),
        }
    }
}

/// 连接池统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub leased: usize,
    pub idle: usize,
}

impl PoolStats {
    pub fn total(&self) -> usize {
        self.leased + self.idle
    }
}

/// 获取连接失败
#[derive(Debug)]
pub enum CheckoutError<E> {
    /// 等待超时
    Timeout,
    /// 建立连接失败
    Connect(E),
}

struct Pooled<C> {
    conn: C,
    ttl_deadline: Instant,
    expires_at: Instant,
}

struct RouteState<C> {
    idle: Vec<Pooled<C>>,
    leased: usize,
}

impl<C> Default for RouteState<C> {
    fn default() -> Self {
        Self { idle: Vec::new(), leased: 0 }
    }
}

impl<C> RouteState<C> {
    fn count(&self) -> usize {
        self.idle.len() + self.leased
    }

    /// 移除过期空闲连接，返回移除数量
    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.idle.len();
        self.idle.retain(|p| p.expires_at > now);
        before - self.idle.len()
    }
}

struct PoolState<C> {
    routes: HashMap<Route, RouteState<C>>,
    total: usize,
}

impl<C> PoolState<C> {
    /// 关闭其他路由中最早过期的一个空闲连接
    fn evict_one_idle(&mut self, except: &Route) -> Option<C> {
        let (route, idx) = self
            .routes
            .iter()
            .filter(|(r, _)| *r != except)
            .flat_map(|(r, state)| state.idle.iter().enumerate().map(move |(i, p)| (r, i, p.expires_at)))
            .min_by_key(|(_, _, expires_at)| *expires_at)
            .map(|(r, i, _)| (r.clone(), i))?;

        let state = self.routes.get_mut(&route)?;
        let pooled = state.idle.swap_remove(idx);
        if state.count() == 0 {
            self.routes.remove(&route);
        }
        self.total -= 1;
        Some(pooled.conn)
    }
}

/// 线程安全的连接池
pub struct ConnectionPool<C> {
    config: PoolConfig,
    state: Mutex<PoolState<C>>,
    available: Condvar,
}

impl<C> ConnectionPool<C> {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PoolState {
                routes: HashMap::new(),
                total: 0,
            }),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 租用一个连接：优先复用空闲连接，否则在限额内调用 `connect` 新建，
    /// 都不满足时等待其他调用方归还
    pub fn checkout<E>(
        &self,
        route: &Route,
        connect: impl FnOnce() -> Result<C, E>,
    ) -> Result<Lease<'_, C>, CheckoutError<E>> {
        let deadline = Instant::now() + self.config.checkout_timeout;
        let mut state = self.lock();

        loop {
            let now = Instant::now();
            let PoolState { routes, total } = &mut *state;

            if let Some(route_state) = routes.get_mut(route) {
                *total -= route_state.purge_expired(now);
                if let Some(pooled) = route_state.idle.pop() {
                    route_state.leased += 1;
                    trace!(route = %route, "Reusing pooled connection");
                    return Ok(Lease {
                        pool: self,
                        route: route.clone(),
                        pooled: Some(pooled),
                        reused: true,
                    });
                }
            }

            let route_count = routes.get(route).map_or(0, RouteState::count);
            if route_count < self.config.max_per_route {
                let mut evicted = None;
                if state.total >= self.config.max_total {
                    evicted = state.evict_one_idle(route);
                }

                if state.total < self.config.max_total {
                    state.routes.entry(route.clone()).or_default().leased += 1;
                    state.total += 1;
                    drop(state);
                    drop(evicted);
                    return self.open(route, now, connect);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(route = %route, "Timed out waiting for pooled connection");
                return Err(CheckoutError::Timeout);
            }
            state = self
                .available
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// 已预留名额，在锁外建立连接
    fn open<E>(
        &self,
        route: &Route,
        now: Instant,
        connect: impl FnOnce() -> Result<C, E>,
    ) -> Result<Lease<'_, C>, CheckoutError<E>> {
        match connect() {
            Ok(conn) => {
                debug!(route = %route, "Opened new connection");
                let ttl_deadline = now + self.config.time_to_live;
                Ok(Lease {
                    pool: self,
                    route: route.clone(),
                    pooled: Some(Pooled {
                        conn,
                        ttl_deadline,
                        expires_at: ttl_deadline,
                    }),
                    reused: false,
                })
            }
            Err(e) => {
                self.give_back(route, None, None);
                Err(CheckoutError::Connect(e))
            }
        }
    }

    /// 归还租约；`keep_alive` 为 None 时关闭连接
    fn give_back(&self, route: &Route, pooled: Option<Pooled<C>>, keep_alive: Option<Duration>) {
        let mut discarded = None;
        {
            let mut state = self.lock();
            let PoolState { routes, total } = &mut *state;

            if let Some(route_state) = routes.get_mut(route) {
                route_state.leased = route_state.leased.saturating_sub(1);

                let now = Instant::now();
                match (pooled, keep_alive) {
                    (Some(mut pooled), Some(keep_alive)) => {
                        pooled.expires_at = pooled.ttl_deadline.min(now + keep_alive);
                        if pooled.expires_at > now {
                            route_state.idle.push(pooled);
                        } else {
                            *total -= 1;
                            discarded = Some(pooled);
                        }
                    }
                    (pooled, _) => {
                        *total -= 1;
                        discarded = pooled;
                    }
                }

                if route_state.count() == 0 {
                    routes.remove(route);
                }
            }
        }
        drop(discarded);
        self.available.notify_all();
    }

    /// 清理所有过期的空闲连接，返回清理数量
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut evicted = Vec::new();
        {
            let mut state = self.lock();
            let PoolState { routes, total } = &mut *state;
            for route_state in routes.values_mut() {
                let (live, expired): (Vec<_>, Vec<_>) =
                    route_state.idle.drain(..).partition(|p| p.expires_at > now);
                route_state.idle = live;
                *total -= expired.len();
                evicted.extend(expired);
            }
            routes.retain(|_, route_state| route_state.count() > 0);
        }

        let count = evicted.len();
        if count > 0 {
            debug!(count, "Evicted expired connections");
            self.available.notify_all();
        }
        count
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        state.routes.values().fold(PoolStats::default(), |acc, r| PoolStats {
            leased: acc.leased + r.leased,
            idle: acc.idle + r.idle.len(),
        })
    }

    pub fn route_stats(&self, route: &Route) -> PoolStats {
        let state = self.lock();
        state
            .routes
            .get(route)
            .map(|r| PoolStats {
                leased: r.leased,
                idle: r.idle.len(),
            })
            .unwrap_or_default()
    }
}

/// 连接租约
pub struct Lease<'a, C> {
    pool: &'a ConnectionPool<C>,
    route: Route,
    pooled: Option<Pooled<C>>,
    reused: bool,
}

impl<C> Lease<'_, C> {
    pub fn connection(&self) -> &C {
        // pooled 只在 release/drop 时取出
        match &self.pooled {
            Some(pooled) => &pooled.conn,
            None => unreachable!("lease used after release"),
        }
    }

    /// 是否复用的空闲连接
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    /// 放回池中，按 keep-alive 计算可复用期限
    pub fn release(mut self, keep_alive: Duration) {
        let pooled = self.pooled.take();
        self.pool.give_back(&self.route, pooled, Some(keep_alive));
    }
}

impl<C> Drop for Lease<'_, C> {
    fn drop(&mut self) {
        if let Some(pooled) = self.pooled.take() {
            self.pool.give_back(&self.route, Some(pooled), None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    fn pool(max_total: usize, max_per_route: usize) -> ConnectionPool<u32> {
        ConnectionPool::new(PoolConfig {
            max_total,
            max_per_route,
            time_to_live: Duration::from_secs(15),
            checkout_timeout: Duration::from_millis(50),
        })
    }

    fn route(host: &str) -> Route {
        Route::new("http", host, 80)
    }

    fn counter() -> impl Fn() -> Result<u32, ()> {
        let next = AtomicU32::new(0);
        move || Ok(next.fetch_add(1, Ordering::SeqCst))
    }

    #[test]
    fn test_route_from_url() {
        let url = Url::parse("https://Open.FeiShu.cn/open-apis/bot/v2/hook/abc").unwrap();
        assert_eq!(Route::from_url(&url).unwrap().as_str(), "https://open.feishu.cn:443");

        let url = Url::parse("http://127.0.0.1:8080/x").unwrap();
        assert_eq!(Route::from_url(&url).unwrap().as_str(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_released_connection_is_reused() {
        let pool = pool(10, 10);
        let connect = counter();
        let a = route("a");

        let lease = pool.checkout(&a, &connect).unwrap();
        assert!(!lease.is_reused());
        assert_eq!(*lease.connection(), 0);
        lease.release(Duration::from_secs(60));
        assert_eq!(pool.stats(), PoolStats { leased: 0, idle: 1 });

        let lease = pool.checkout(&a, &connect).unwrap();
        assert!(lease.is_reused());
        assert_eq!(*lease.connection(), 0);
    }

    #[test]
    fn test_dropped_lease_discards_connection() {
        let pool = pool(10, 10);
        let connect = counter();
        let a = route("a");

        {
            let _lease = pool.checkout(&a, &connect).unwrap();
            assert_eq!(pool.route_stats(&a), PoolStats { leased: 1, idle: 0 });
        }
        assert_eq!(pool.stats().total(), 0);

        let lease = pool.checkout(&a, &connect).unwrap();
        assert_eq!(*lease.connection(), 1);
    }

    #[test]
    fn test_zero_keep_alive_is_not_pooled() {
        let pool = pool(10, 10);
        let lease = pool.checkout(&route("a"), counter()).unwrap();
        lease.release(Duration::ZERO);
        assert_eq!(pool.stats().total(), 0);
    }

    #[test]
    fn test_per_route_limit_times_out() {
        let pool = pool(10, 2);
        let connect = counter();
        let a = route("a");

        let _l1 = pool.checkout(&a, &connect).unwrap();
        let _l2 = pool.checkout(&a, &connect).unwrap();
        assert!(matches!(pool.checkout(&a, &connect), Err(CheckoutError::Timeout)));

        // 其他路由不受影响
        assert!(pool.checkout(&route("b"), &connect).is_ok());
    }

    #[test]
    fn test_total_limit_evicts_idle_of_other_route() {
        let pool = pool(2, 2);
        let connect = counter();

        let _held = pool.checkout(&route("a"), &connect).unwrap();
        pool.checkout(&route("b"), &connect).unwrap().release(Duration::from_secs(60));
        assert_eq!(pool.stats().total(), 2);

        let lease = pool.checkout(&route("c"), &connect).unwrap();
        assert_eq!(*lease.connection(), 2);
        assert_eq!(pool.route_stats(&route("b")), PoolStats::default());
        assert_eq!(pool.stats().total(), 2);
    }

    #[test]
    fn test_total_limit_without_idle_times_out() {
        let pool = pool(1, 5);
        let connect = counter();
        let _held = pool.checkout(&route("a"), &connect).unwrap();
        assert!(matches!(pool.checkout(&route("b"), &connect), Err(CheckoutError::Timeout)));
    }

    #[test]
    fn test_connect_error_releases_reservation() {
        let pool = pool(1, 1);
        let failed = pool.checkout(&route("a"), || Err::<u32, _>("refused"));
        assert!(matches!(failed, Err(CheckoutError::Connect("refused"))));
        assert_eq!(pool.stats().total(), 0);
        assert!(pool.checkout(&route("a"), counter()).is_ok());
    }

    #[test]
    fn test_evict_expired() {
        let pool = pool(10, 10);
        let connect = counter();
        pool.checkout(&route("a"), &connect).unwrap().release(Duration::from_millis(10));
        pool.checkout(&route("b"), &connect).unwrap().release(Duration::from_secs(60));

        thread::sleep(Duration::from_millis(30));
        assert_eq!(pool.evict_expired(), 1);
        assert_eq!(pool.stats(), PoolStats { leased: 0, idle: 1 });
        assert_eq!(pool.route_stats(&route("a")), PoolStats::default());
    }

    #[test]
    fn test_ttl_caps_keep_alive() {
        let pool: ConnectionPool<u32> = ConnectionPool::new(PoolConfig {
            time_to_live: Duration::from_millis(10),
            ..PoolConfig::default()
        });
        pool.checkout(&route("a"), counter()).unwrap().release(Duration::from_secs(60));

        thread::sleep(Duration::from_millis(30));
        assert_eq!(pool.evict_expired(), 1);
    }

    #[test]
    fn test_waiting_checkout_wakes_on_release() {
        let pool: ConnectionPool<u32> = ConnectionPool::new(PoolConfig {
            max_total: 1,
            max_per_route: 1,
            time_to_live: Duration::from_secs(15),
            checkout_timeout: Duration::from_secs(5),
        });
        let connect = counter();
        let a = route("a");
        let held = pool.checkout(&a, &connect).unwrap();

        thread::scope(|s| {
            s.spawn(move || {
                thread::sleep(Duration::from_millis(50));
                held.release(Duration::from_secs(60));
            });

            let lease = pool.checkout(&a, &connect).unwrap();
            assert!(lease.is_reused());
        });
    }

    #[test]
    fn test_concurrent_checkouts_respect_route_limit() {
        let pool: ConnectionPool<u32> = ConnectionPool::new(PoolConfig {
            max_total: 100,
            max_per_route: 4,
            time_to_live: Duration::from_secs(15),
            checkout_timeout: Duration::from_secs(5),
        });
        let connect = counter();
        let a = route("a");
        let peak = AtomicU32::new(0);

        thread::scope(|s| {
            for _ in 0..16 {
                s.spawn(|| {
                    for _ in 0..20 {
                        let lease = pool.checkout(&a, &connect).unwrap();
                        let leased = pool.route_stats(&a).leased as u32;
                        peak.fetch_max(leased, Ordering::SeqCst);
                        lease.release(Duration::from_secs(60));
                    }
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert_eq!(pool.stats().leased, 0);
        assert!(pool.stats().idle <= 4);
    }
}
