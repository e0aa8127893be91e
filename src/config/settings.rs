// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::engines::identity::IdentityPool;
use crate::engines::politeness::Politeness;
use crate::engines::throttle::{AutoThrottle, ThrottleConfig};
use crate::utils::retry_policy::{RetryPolicy, DEFAULT_RETRY_HTTP_CODES};

/// 应用程序配置设置
///
/// 包含清单、输出、爬取节奏、重试、身份轮换和日志等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 站点清单配置
    pub manifest: ManifestSettings,
    /// 输出配置
    pub output: OutputSettings,
    /// 爬取配置
    pub crawler: CrawlerSettings,
    /// 自适应限速配置
    pub throttle: ThrottleSettings,
    /// 重试配置
    pub retry: RetrySettings,
    /// 身份轮换配置
    pub identity: IdentitySettings,
    /// 日志配置
    pub logging: LoggingSettings,
    /// 只运行这些站点，未设置时运行清单中的全部站点
    #[serde(default)]
    pub sites: Option<Vec<String>>,
}

/// 站点清单配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestSettings {
    /// 清单文件路径
    pub path: String,
}

/// 输出配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    /// 输出目录
    pub dir: String,
    /// 是否写入运行汇总
    pub summary: bool,
}

/// 爬取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// 每个会话同时在途的请求数
    pub concurrent_requests: usize,
    /// 基础请求间隔（毫秒）
    pub download_delay_ms: u64,
    /// 是否随机化请求间隔
    pub randomize_delay: bool,
    /// 请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 每个站点最多抓取的页数
    #[serde(default)]
    pub max_pages: Option<usize>,
    /// 是否遵守 robots.txt
    pub obey_robots: bool,
}

/// 自适应限速配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleSettings {
    pub enabled: bool,
    pub start_delay_ms: u64,
    pub max_delay_ms: u64,
    pub target_concurrency: f64,
}

/// 重试配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// 最大尝试次数（含首次请求）
    pub max_attempts: u32,
    /// 视为暂时性失败的HTTP状态码
    pub http_codes: Vec<u16>,
}

/// 身份轮换配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySettings {
    /// User-Agent 列表，为空时使用内置列表
    pub user_agents: Vec<String>,
    /// 代理列表
    pub proxies: Vec<String>,
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// 是否输出 JSON 格式日志
    pub json: bool,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加内置默认值、`config/default`、`config/{APP_ENVIRONMENT}` 与
    /// `JOBCRAWL__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("JOBCRAWL")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("identity.proxies")
                    .with_list_parse_key("sites"),
            );

        builder.build()?.try_deserialize()
    }

    /// 从 TOML 字符串加载配置，未出现的键使用默认值
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let http_codes: Vec<i64> = DEFAULT_RETRY_HTTP_CODES.iter().map(|c| *c as i64).collect();
        Config::builder()
            // Manifest and output
            .set_default("manifest.path", "data/job_boards.json")?
            .set_default("output.dir", "data/output")?
            .set_default("output.summary", true)?
            // Crawler pacing
            .set_default("crawler.concurrent_requests", 4)?
            .set_default("crawler.download_delay_ms", 3000)?
            .set_default("crawler.randomize_delay", true)?
            .set_default("crawler.request_timeout_secs", 60)?
            .set_default("crawler.obey_robots", true)?
            // Adaptive throttling
            .set_default("throttle.enabled", true)?
            .set_default("throttle.start_delay_ms", 5000)?
            .set_default("throttle.max_delay_ms", 60000)?
            .set_default("throttle.target_concurrency", 1.0)?
            // Retry
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.http_codes", http_codes)?
            // Identity rotation
            .set_default("identity.user_agents", Vec::<String>::new())?
            .set_default("identity.proxies", Vec::<String>::new())?
            .set_default("logging.json", false)
    }

    /// 请求超时时间
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.request_timeout_secs)
    }

    /// 限速配置
    pub fn throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig {
            download_delay: Duration::from_millis(self.crawler.download_delay_ms),
            randomize: self.crawler.randomize_delay,
            auto_throttle: self.throttle.enabled,
            start_delay: Duration::from_millis(self.throttle.start_delay_ms),
            max_delay: Duration::from_millis(self.throttle.max_delay_ms),
            target_concurrency: self.throttle.target_concurrency,
        }
    }

    /// 页面抓取的重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            retry_http_codes: self.retry.http_codes.clone(),
            ..RetryPolicy::standard()
        }
    }

    pub fn identity_pool(&self) -> IdentityPool {
        IdentityPool::new(
            self.identity.user_agents.clone(),
            self.identity.proxies.clone(),
        )
    }

    /// 为一个站点会话创建独立的礼貌策略
    pub fn politeness(&self) -> Politeness {
        Politeness::new(
            self.crawler.concurrent_requests,
            AutoThrottle::new(self.throttle_config()),
            Arc::new(self.identity_pool()),
            self.retry_policy(),
            self.request_timeout(),
        )
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
