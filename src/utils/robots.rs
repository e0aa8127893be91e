// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Proxy};
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::utils::retry_policy::RetryPolicy;

/// Robots.txt检查器接口
#[async_trait]
pub trait RobotsCheckerTrait: Send + Sync {
    /// 检查URL是否被允许访问
    ///
    /// `proxy` 为本次请求的代理，robots.txt 经同一代理获取
    async fn is_allowed(&self, url_str: &str, user_agent: &str, proxy: Option<&str>)
        -> Result<bool>;
}

/// 缓存的Robots.txt内容
#[derive(Clone)]
struct CachedRobots {
    /// 内容
    content: String,

    /// 过期时间
    expires_at: Instant,
}

/// Robots.txt检查器
///
/// 按站点来源（scheme + host + port）缓存 robots.txt 内容。
#[derive(Clone)]
pub struct RobotsChecker {
    /// HTTP客户端
    client: Client,

    /// 内存缓存
    memory_cache: Arc<Mutex<HashMap<String, CachedRobots>>>,

    /// 重试策略
    retry_policy: RetryPolicy,

    /// 缓存有效期
    ttl: Duration,
}

#[async_trait]
impl RobotsCheckerTrait for RobotsChecker {
    async fn is_allowed(
        &self,
        url_str: &str,
        user_agent: &str,
        proxy: Option<&str>,
    ) -> Result<bool> {
        let content = self.get_robots_content(url_str, user_agent, proxy).await?;
        if content.is_empty() {
            return Ok(true);
        }
        let mut matcher = DefaultMatcher::default();
        Ok(matcher.one_agent_allowed_by_robots(&content, user_agent, url_str))
    }
}

impl Default for RobotsChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotsChecker {
    /// 创建新的Robots检查器实例
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            memory_cache: Arc::new(Mutex::new(HashMap::new())),
            retry_policy: RetryPolicy::robots(),
            ttl: Duration::from_secs(3600),
        }
    }

    /// robots.txt 所在地址
    fn robots_url(url_str: &str) -> Result<String> {
        let url = Url::parse(url_str)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid URL: {}", url_str))?;
        let port = url.port_or_known_default().unwrap_or(80);
        Ok(format!("{}://{}:{}/robots.txt", url.scheme(), host, port))
    }

    /// 获取请求所用的客户端，配置了代理时单独构建
    fn client_for(&self, proxy: Option<&str>) -> Result<Client> {
        match proxy {
            Some(proxy_url) => Ok(Client::builder().proxy(Proxy::all(proxy_url)?).build()?),
            None => Ok(self.client.clone()),
        }
    }

    /// 获取Robots.txt内容（带缓存）
    async fn get_robots_content(
        &self,
        url_str: &str,
        user_agent: &str,
        proxy: Option<&str>,
    ) -> Result<String> {
        let robots_url = Self::robots_url(url_str)?;

        {
            let mut cache = self.memory_cache.lock();
            if let Some(cached) = cache.get(&robots_url) {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.content.clone());
                }
                cache.remove(&robots_url);
            }
        }

        let client = self.client_for(proxy)?;
        let mut attempt = 0;
        let mut content = String::new();
        let mut last_error = None;

        while attempt < self.retry_policy.max_attempts {
            attempt += 1;
            let response = client
                .get(&robots_url)
                .header("User-Agent", user_agent)
                .timeout(Duration::from_secs(5))
                .send()
                .await;

            match response {
                Ok(resp) => {
                    if resp.status().is_success() {
                        content = resp.text().await.unwrap_or_default();
                        last_error = None;
                        break;
                    } else if resp.status().is_server_error() {
                        last_error = Some(anyhow::anyhow!("Server error: {}", resp.status()));
                    } else {
                        // 404 and other client errors mean there is no usable robots.txt
                        content.clear();
                        last_error = None;
                        break;
                    }
                }
                Err(e) => {
                    last_error = Some(anyhow::anyhow!("Request failed: {}", e));
                }
            }

            if self.retry_policy.should_retry(attempt) {
                tokio::time::sleep(self.retry_policy.calculate_backoff(attempt)).await;
            }
        }

        if let Some(err) = last_error {
            tracing::warn!("Failed to fetch robots.txt from {}: {}", robots_url, err);
            content.clear();
        }

        self.memory_cache.lock().insert(
            robots_url,
            CachedRobots {
                content: content.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );

        Ok(content)
    }

    /// 使用给定内容预置缓存
    pub fn seed(&self, url_str: &str, content: impl Into<String>) -> Result<()> {
        let robots_url = Self::robots_url(url_str)?;
        self.memory_cache.lock().insert(
            robots_url,
            CachedRobots {
                content: content.into(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robots_url_keeps_scheme_and_port() {
        assert_eq!(
            RobotsChecker::robots_url("https://example.com/jobs?page=2").unwrap(),
            "https://example.com:443/robots.txt"
        );
        assert_eq!(
            RobotsChecker::robots_url("http://127.0.0.1:8080/a/b").unwrap(),
            "http://127.0.0.1:8080/robots.txt"
        );
        assert!(RobotsChecker::robots_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_seeded_rules_are_enforced() {
        let checker = RobotsChecker::new();
        checker
            .seed(
                "https://jobs.example.com/",
                "User-agent: *\nDisallow: /private\n",
            )
            .unwrap();

        assert!(checker
            .is_allowed("https://jobs.example.com/remote-jobs", "Mozilla/5.0", None)
            .await
            .unwrap());
        assert!(!checker
            .is_allowed("https://jobs.example.com/private/list", "Mozilla/5.0", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_empty_robots_allows_everything() {
        let checker = RobotsChecker::new();
        checker.seed("https://jobs.example.com/", "").unwrap();

        assert!(checker
            .is_allowed("https://jobs.example.com/anything", "jobcrawl", None)
            .await
            .unwrap());
    }
}
