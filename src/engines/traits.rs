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

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 非成功的HTTP状态码
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    /// 被 robots.txt 禁止
    #[error("Disallowed by robots.txt: {0}")]
    RobotsDisallowed(String),
    /// 无效的URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// 会话已取消
    #[error("Cancelled")]
    Cancelled,
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl EngineError {
    /// 判断错误是否可重试
    ///
    /// 状态码的判定由重试策略根据配置完成，这里只给出默认判断。
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::RequestFailed(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            EngineError::Timeout => true,
            EngineError::HttpStatus(code) => {
                matches!(code, 500 | 502 | 503 | 504 | 408 | 429)
            }
            _ => false,
        }
    }

    /// 日志中使用的错误类别
    pub fn kind(&self) -> &'static str {
        if self.is_retryable() {
            "transient"
        } else {
            "fatal"
        }
    }
}

/// 抓取请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 目标URL
    pub url: Url,
    /// 本次请求使用的 User-Agent
    pub user_agent: String,
    /// 代理配置 (URL)
    pub proxy: Option<String>,
    /// 超时时间
    pub timeout: Duration,
}

/// 抓取响应
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP状态码
    pub status: u16,
    /// 响应内容
    pub body: String,
    /// 重定向后的最终URL
    pub final_url: Url,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

impl FetchResponse {
    /// 是否为 2xx 响应
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 抓取器特质
///
/// 爬虫引擎依赖的传输层协作者。实现必须遵守 robots.txt，
/// 对被禁止的URL直接返回 [`EngineError::RobotsDisallowed`]。
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// 执行抓取
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
