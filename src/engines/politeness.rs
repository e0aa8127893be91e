// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::engines::identity::IdentityPool;
use crate::engines::throttle::AutoThrottle;
use crate::engines::traits::{EngineError, FetchRequest, FetchResponse, Fetcher};
use crate::utils::retry_policy::RetryPolicy;

/// 礼貌抓取控制器
///
/// 负责单个站点会话的请求节奏：请求间隔、并发槽位、身份轮换以及暂时性失败的重试。
#[derive(Debug)]
pub struct Politeness {
    slots: Semaphore,
    concurrency: usize,
    throttle: AutoThrottle,
    identities: Arc<IdentityPool>,
    retry: RetryPolicy,
    timeout: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Politeness {
    /// 创建控制器，`concurrency` 为同时在途的请求上限
    pub fn new(
        concurrency: usize,
        throttle: AutoThrottle,
        identities: Arc<IdentityPool>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            slots: Semaphore::new(concurrency),
            concurrency,
            throttle,
            identities,
            retry,
            timeout,
            next_slot: Mutex::new(None),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn throttle(&self) -> &AutoThrottle {
        &self.throttle
    }

    /// 预留下一次请求的发出时间
    fn reserve_slot(&self) -> Instant {
        let now = Instant::now();
        let mut next_slot = self.next_slot.lock();
        let start = match *next_slot {
            Some(at) if at > now => at,
            _ => now,
        };
        *next_slot = Some(start + self.throttle.next_delay());
        start
    }

    /// 等待轮到本次请求，期间可被取消
    async fn wait_turn(&self, cancel: &CancellationToken) -> Result<(), EngineError> {
        let start = self.reserve_slot();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            _ = tokio::time::sleep_until(start) => Ok(()),
        }
    }

    /// 按礼貌策略抓取一个URL
    ///
    /// 非 2xx 响应转换为 [`EngineError::HttpStatus`]。暂时性失败按重试策略重新排队，
    /// 用尽尝试次数后返回最后一次的错误。
    pub async fn fetch<F>(
        &self,
        fetcher: &F,
        url: &Url,
        site: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, EngineError>
    where
        F: Fetcher + ?Sized,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.wait_turn(cancel).await?;

            let identity = self.identities.acquire();
            let request = FetchRequest {
                url: url.clone(),
                user_agent: identity.user_agent.clone(),
                proxy: identity.proxy.clone(),
                timeout: self.timeout,
            };

            let started = Instant::now();
            let result = {
                let _permit = self
                    .slots
                    .acquire()
                    .await
                    .map_err(|_| EngineError::Cancelled)?;
                match fetcher.fetch(&request).await {
                    Ok(response) if response.is_success() => Ok(response),
                    Ok(response) => Err(EngineError::HttpStatus(response.status)),
                    Err(e) => Err(e),
                }
            };
            let latency = started.elapsed();

            let error = match result {
                Ok(response) => {
                    self.identities.release(&identity, true);
                    self.throttle.record_response(latency, true);
                    debug!(
                        site,
                        url = %url,
                        status = response.status,
                        latency_ms = response.response_time_ms,
                        "Fetched page"
                    );
                    return Ok(response);
                }
                Err(error) => error,
            };

            let transport_failure =
                matches!(error, EngineError::RequestFailed(_) | EngineError::Timeout);
            self.identities.release(&identity, !transport_failure);

            if self.retry.is_transient(&error) {
                self.throttle.record_failure();
            } else {
                self.throttle.record_response(latency, false);
            }

            if !self.retry.should_retry_with_error(attempt, &error) {
                return Err(error);
            }
            warn!(
                site,
                url = %url,
                attempt,
                max_attempts = self.retry.max_attempts,
                error = %error,
                "Transient failure, retrying"
            );
        }
    }
}
