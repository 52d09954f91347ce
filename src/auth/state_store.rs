//! # OAuth state 存储
//!
//! 授权跳转时生成一次性 state，回调时校验并删除。校验与删除是同一个原子操作，
//! 同一个 state 无论校验结果如何只能被使用一次。

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use dashmap::DashMap;
use rand::RngCore;
use rand::rngs::OsRng;
use redis::aio::ConnectionManager;
use tokio::task::JoinHandle;

use crate::config::{StateStoreBackend, StateStoreConfig};
use crate::error::{AuthError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo};

/// state 随机字节数（256 位）
const STATE_BYTES: usize = 32;

const REDIS_KEY_PREFIX: &str = "oauth_state:";

/// 生成一个新的随机 state
#[must_use]
pub fn random_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 一次性 state 存储
#[async_trait]
pub trait StateStore: Send + Sync {
    /// 生成并保存一个新的 state
    async fn generate_state(&self) -> Result<String>;

    /// state 存在且未过期时返回 `true`；无论结果如何都会删除该 state
    async fn validate_and_consume(&self, state: &str) -> Result<bool>;
}

/// 进程内 state 存储
#[derive(Debug)]
pub struct InMemoryStateStore {
    entries: DashMap<String, Instant>,
    ttl: Duration,
}

impl InMemoryStateStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// 删除所有已过期的 state，返回删除数量
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// 当前保存的 state 数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 启动周期性清理任务
    pub fn spawn_cleanup(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    ldebug!(
                        "system",
                        LogStage::BackgroundTask,
                        LogComponent::StateStore,
                        "purge_expired",
                        "清理过期 state",
                        purged = purged,
                        remaining = store.len()
                    );
                }
            }
        })
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn generate_state(&self) -> Result<String> {
        let expires_at = Instant::now()
            .checked_add(self.ttl)
            .ok_or_else(|| AuthError::internal("state 有效期超出范围"))?;
        let state = random_state();
        self.entries.insert(state.clone(), expires_at);
        Ok(state)
    }

    async fn validate_and_consume(&self, state: &str) -> Result<bool> {
        // remove 持有分片写锁，并发调用中只有一个能拿到条目
        Ok(self
            .entries
            .remove(state)
            .is_some_and(|(_, expires_at)| expires_at > Instant::now()))
    }
}

/// Redis state 存储，`SET EX NX` 写入、`GETDEL` 消费
#[derive(Clone)]
pub struct RedisStateStore {
    connection_manager: ConnectionManager,
    ttl_secs: u64,
}

impl RedisStateStore {
    pub async fn connect(url: &str, ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AuthError::config_with_source("创建 Redis 客户端失败", e))?;
        let connection_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AuthError::internal_with_source("建立 Redis 连接失败", e))?;

        linfo!(
            "system",
            LogStage::Cache,
            LogComponent::StateStore,
            "redis_connected",
            "Redis 连接建立成功"
        );

        Ok(Self {
            connection_manager,
            ttl_secs,
        })
    }

    fn key(state: &str) -> String {
        format!("{REDIS_KEY_PREFIX}{state}")
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn generate_state(&self) -> Result<String> {
        let state = random_state();
        let mut conn = self.connection_manager.clone();

        let stored: Option<String> = redis::cmd("SET")
            .arg(Self::key(&state))
            .arg("1")
            .arg("EX")
            .arg(self.ttl_secs)
            .arg("NX")
            .query_async(&mut conn)
            .await?;

        if stored.is_none() {
            return Err(AuthError::internal("state 冲突，写入失败"));
        }
        Ok(state)
    }

    async fn validate_and_consume(&self, state: &str) -> Result<bool> {
        if state.is_empty() {
            return Ok(false);
        }
        let mut conn = self.connection_manager.clone();

        let value: Option<String> = redis::cmd("GETDEL")
            .arg(Self::key(state))
            .query_async(&mut conn)
            .await?;
        Ok(value.is_some())
    }
}

/// 根据配置创建 state 存储
///
/// 内存后端会同时启动过期清理任务。
pub async fn build_state_store(config: &StateStoreConfig) -> Result<Arc<dyn StateStore>> {
    let ttl = Duration::from_secs(config.ttl_secs);
    match config.backend {
        StateStoreBackend::Memory => {
            let store = Arc::new(InMemoryStateStore::new(ttl));
            store.spawn_cleanup(Duration::from_secs(config.cleanup_interval_secs));
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::StateStore,
                "state_store_ready",
                "使用进程内 state 存储",
                ttl_secs = config.ttl_secs
            );
            Ok(store)
        }
        StateStoreBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| AuthError::config("STATE_STORE=redis 时必须设置 REDIS_URL"))?;
            Ok(Arc::new(RedisStateStore::connect(url, config.ttl_secs).await?))
        }
    }
}
