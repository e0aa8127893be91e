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

use crate::engines::traits::{EngineError, FetchRequest, FetchResponse, Fetcher};
use crate::utils::robots::{RobotsChecker, RobotsCheckerTrait};
use async_trait::async_trait;
use std::time::Instant;

/// 抓取引擎
///
/// 基于reqwest实现的HTTP抓取引擎，可选地在请求前检查 robots.txt
pub struct ReqwestEngine<C: RobotsCheckerTrait = RobotsChecker> {
    robots: Option<C>,
}

impl ReqwestEngine<RobotsChecker> {
    /// 创建引擎
    ///
    /// # 参数
    ///
    /// * `obey_robots` - 是否遵守 robots.txt
    pub fn new(obey_robots: bool) -> Self {
        Self {
            robots: obey_robots.then(RobotsChecker::new),
        }
    }
}

impl<C: RobotsCheckerTrait> ReqwestEngine<C> {
    /// 使用自定义的 robots 检查器创建引擎
    pub fn with_checker(checker: C) -> Self {
        Self {
            robots: Some(checker),
        }
    }

    async fn check_robots(&self, request: &FetchRequest) -> Result<(), EngineError> {
        let Some(robots) = &self.robots else {
            return Ok(());
        };
        let allowed = robots
            .is_allowed(
                request.url.as_str(),
                &request.user_agent,
                request.proxy.as_deref(),
            )
            .await
            .map_err(|e| EngineError::Other(format!("robots.txt check failed: {}", e)))?;
        if allowed {
            Ok(())
        } else {
            Err(EngineError::RobotsDisallowed(request.url.to_string()))
        }
    }
}

#[async_trait]
impl<C: RobotsCheckerTrait> Fetcher for ReqwestEngine<C> {
    /// 执行HTTP抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResponse)` - 抓取响应，包含非 2xx 状态
    /// * `Err(EngineError)` - 抓取过程中出现的错误
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        self.check_robots(request).await?;

        // Each request gets a fresh client so identities never share connections
        let mut builder = reqwest::Client::builder()
            .user_agent(request.user_agent.as_str())
            .timeout(request.timeout);

        if let Some(proxy_url) = &request.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| EngineError::Other(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        let start = Instant::now();
        let response = client
            .get(request.url.clone())
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let body = response.text().await.map_err(map_request_error)?;

        Ok(FetchResponse {
            status,
            body,
            final_url,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

fn map_request_error(error: reqwest::Error) -> EngineError {
    if error.is_timeout() {
        EngineError::Timeout
    } else {
        EngineError::RequestFailed(error)
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
