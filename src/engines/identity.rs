// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 内置的桌面浏览器 User-Agent 列表
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// 连续失败达到该次数的代理暂停使用
const PROXY_FAILURE_THRESHOLD: u32 = 3;

/// 单次请求使用的身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
    pub proxy: Option<String>,
}

/// 身份池
///
/// 每次请求随机选取 User-Agent，代理按轮询方式分配。
/// 连续失败的代理会被跳过，全部失效时重置。
#[derive(Debug)]
pub struct IdentityPool {
    user_agents: Vec<String>,
    proxies: Vec<String>,
    cursor: AtomicUsize,
    proxy_failures: Mutex<HashMap<String, u32>>,
}

impl IdentityPool {
    /// 创建身份池，`user_agents` 为空时使用内置列表
    pub fn new(user_agents: Vec<String>, proxies: Vec<String>) -> Self {
        let user_agents = if user_agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
        } else {
            user_agents
        };
        Self {
            user_agents,
            proxies,
            cursor: AtomicUsize::new(0),
            proxy_failures: Mutex::new(HashMap::new()),
        }
    }

    /// 为下一次请求选取身份
    pub fn acquire(&self) -> Identity {
        let user_agent =
            self.user_agents[rand::random_range(0..self.user_agents.len())].clone();
        Identity {
            user_agent,
            proxy: self.next_proxy(),
        }
    }

    fn next_proxy(&self) -> Option<String> {
        if self.proxies.is_empty() {
            return None;
        }
        let mut failures = self.proxy_failures.lock();
        if self
            .proxies
            .iter()
            .all(|p| failures.get(p).copied().unwrap_or(0) >= PROXY_FAILURE_THRESHOLD)
        {
            tracing::warn!("All proxies marked dead, resetting proxy pool");
            failures.clear();
        }
        for _ in 0..self.proxies.len() {
            let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
            let proxy = &self.proxies[index];
            if failures.get(proxy).copied().unwrap_or(0) < PROXY_FAILURE_THRESHOLD {
                return Some(proxy.clone());
            }
        }
        None
    }

    /// 归还身份并报告本次请求结果
    pub fn release(&self, identity: &Identity, success: bool) {
        let Some(proxy) = &identity.proxy else {
            return;
        };
        let mut failures = self.proxy_failures.lock();
        if success {
            failures.remove(proxy);
        } else {
            *failures.entry(proxy.clone()).or_insert(0) += 1;
        }
    }
}
