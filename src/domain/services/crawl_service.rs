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

use crate::domain::models::session::{CrawlSession, SessionState};
use crate::domain::models::site::SiteConfig;
use crate::domain::repositories::job_sink::{JobSink, SinkError};
use crate::domain::services::extraction_service::{ExtractError, ExtractionService, Page};
use crate::domain::services::normalization_service::NormalizationPipeline;
use crate::domain::services::site_profiles::SiteProfile;
use crate::domain::services::site_registry::{RegistryError, SiteRegistry};
use crate::engines::politeness::Politeness;
use crate::engines::traits::{EngineError, FetchResponse, Fetcher};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Instrument};
use url::Url;

/// 爬虫错误类型
#[derive(Error, Debug)]
pub enum SpiderError {
    /// 站点配置错误
    #[error(transparent)]
    Config(#[from] RegistryError),
    /// 选择器无法编译
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// 起始URL无效
    #[error("Invalid start URL {url}: {source}")]
    InvalidStartUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// 结果写入失败
    #[error("Failed to save results: {0}")]
    Sink(#[from] SinkError),
}

/// 单个站点的爬取报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub site: String,
    pub records: usize,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub duplicates: usize,
    pub cancelled: bool,
}

type FetchOutcome = (Url, Result<FetchResponse, EngineError>);

/// 爬取服务
///
/// 驱动单个站点的 抓取 → 提取 → 翻页 循环。
/// 待抓取URL通过 pending 通道交给调度任务，抓取结果通过 ready 通道交回会话循环，
/// 两个通道的容量等于并发上限。
pub struct CrawlService<F: Fetcher + 'static> {
    /// 站点名称
    site: String,
    /// 起始页
    start_url: Url,
    /// 提取器
    extractor: ExtractionService,
    /// 规范化管道
    pipeline: NormalizationPipeline,
    /// 抓取器
    fetcher: Arc<F>,
    /// 礼貌策略
    politeness: Arc<Politeness>,
    /// 最大页数
    max_pages: Option<usize>,
}

impl<F: Fetcher + 'static> CrawlService<F> {
    /// 创建新的爬取服务实例
    ///
    /// # 参数
    ///
    /// * `site` - 站点配置
    /// * `profile` - 站点扩展点
    /// * `fetcher` - 抓取器
    /// * `politeness` - 本会话的礼貌策略
    /// * `max_pages` - 最大页数，优先于站点扩展点中的设置
    pub fn new(
        site: &SiteConfig,
        profile: &SiteProfile,
        fetcher: Arc<F>,
        politeness: Arc<Politeness>,
        max_pages: Option<usize>,
    ) -> Result<Self, SpiderError> {
        let start_url =
            Url::parse(&site.start_url).map_err(|source| SpiderError::InvalidStartUrl {
                url: site.start_url.clone(),
                source,
            })?;
        let manifest = profile.apply_to(&site.selectors);
        let extractor = ExtractionService::new(&manifest)?;

        Ok(Self {
            site: site.name.clone(),
            start_url,
            extractor,
            pipeline: NormalizationPipeline::new(profile.hooks.clone()),
            fetcher,
            politeness,
            max_pages: max_pages.or(profile.max_pages),
        })
    }

    /// 从注册表中查找站点并创建服务，站点扩展点按名称选取
    pub fn from_registry(
        registry: &SiteRegistry,
        name: &str,
        fetcher: Arc<F>,
        politeness: Arc<Politeness>,
        max_pages: Option<usize>,
    ) -> Result<Self, SpiderError> {
        let site = registry.resolve(name)?;
        let profile = SiteProfile::for_site(&site.name);
        Self::new(&site, &profile, fetcher, politeness, max_pages)
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    /// 启动调度任务
    ///
    /// 每个待抓取URL在独立任务中经过礼貌策略抓取，结果发送到 ready 通道。
    fn spawn_dispatcher(
        &self,
        mut pending: mpsc::Receiver<Url>,
        ready: mpsc::Sender<FetchOutcome>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let fetcher = Arc::clone(&self.fetcher);
        let politeness = Arc::clone(&self.politeness);
        let site = self.site.clone();

        tokio::spawn(
            async move {
                while let Some(url) = pending.recv().await {
                    let fetcher = Arc::clone(&fetcher);
                    let politeness = Arc::clone(&politeness);
                    let ready = ready.clone();
                    let cancel = cancel.clone();
                    let site = site.clone();
                    tokio::spawn(
                        async move {
                            let result = politeness
                                .fetch(fetcher.as_ref(), &url, &site, &cancel)
                                .await;
                            let _ = ready.send((url, result)).await;
                        }
                        .in_current_span(),
                    );
                }
            }
            .in_current_span(),
        )
    }

    /// 执行爬取，返回累积了全部记录的会话
    ///
    /// 单页失败只会让翻页停在该页，不会丢弃已有记录。取消后不再发起新的抓取，
    /// 已在途的抓取照常完成。
    #[instrument(skip(self, cancel), fields(site = %self.site))]
    pub async fn crawl(&self, cancel: &CancellationToken) -> CrawlSession {
        let mut session = CrawlSession::new(self.site.clone());
        let capacity = self.politeness.concurrency();
        let (pending_tx, pending_rx) = mpsc::channel::<Url>(capacity);
        let (ready_tx, mut ready_rx) = mpsc::channel::<FetchOutcome>(capacity);
        let dispatcher = self.spawn_dispatcher(pending_rx, ready_tx, cancel.clone());

        let mut visited = HashSet::new();
        let mut in_flight = 0usize;

        if cancel.is_cancelled() {
            info!("Cancelled before start");
        } else {
            visited.insert(self.start_url.clone());
            if pending_tx.send(self.start_url.clone()).await.is_ok() {
                session.transition(SessionState::Fetching);
                in_flight += 1;
            }
        }

        while in_flight > 0 {
            let Some((url, result)) = ready_rx.recv().await else {
                break;
            };
            in_flight -= 1;

            let response = match result {
                Ok(response) => response,
                Err(EngineError::Cancelled) => {
                    info!(url = %url, "Cancelled before fetch");
                    continue;
                }
                Err(e) => {
                    session.record_page_failed();
                    error!(
                        url = %url,
                        kind = e.kind(),
                        error = %e,
                        "Page fetch failed, pagination stops here"
                    );
                    continue;
                }
            };

            session.record_page_fetched();
            session.transition(SessionState::Extracting);
            visited.insert(response.final_url.clone());
            let Some(next) = self.process_page(response, &mut session) else {
                continue;
            };

            if cancel.is_cancelled() {
                info!(next = %next, "Cancelled, not following next page");
            } else if self
                .max_pages
                .is_some_and(|max| session.pages_fetched() >= max)
            {
                info!(next = %next, pages = session.pages_fetched(), "Page limit reached");
            } else if !visited.insert(next.clone()) {
                warn!(next = %next, "Next page already visited, stopping pagination");
            } else {
                session.transition(SessionState::Paginating);
                if pending_tx.send(next).await.is_ok() {
                    session.transition(SessionState::Fetching);
                    in_flight += 1;
                }
            }
        }

        drop(pending_tx);
        if let Err(e) = dispatcher.await {
            error!("Fetch dispatcher failed: {}", e);
        }
        session.transition(SessionState::Completed);
        session
    }

    /// 提取单个页面并返回下一页地址
    ///
    /// 同步执行：解析后的文档不会跨越挂起点。
    fn process_page(&self, response: FetchResponse, session: &mut CrawlSession) -> Option<Url> {
        let page = Page::parse(response.final_url, &response.body);

        let mut found = 0usize;
        let mut kept = 0usize;
        for raw in self.extractor.extract_all(&page) {
            found += 1;
            if self.pipeline.process(raw, session) {
                kept += 1;
            }
        }
        debug!(url = %page.url(), found, kept, "Extracted page");

        self.extractor.next_page(&page)
    }

    /// 执行爬取并写入存储
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlReport)` - 爬取报告
    /// * `Err(SpiderError)` - 写入失败
    #[instrument(skip(self, sink, cancel), fields(site = %self.site))]
    pub async fn run<S: JobSink + ?Sized>(
        &self,
        sink: &S,
        cancel: &CancellationToken,
    ) -> Result<CrawlReport, SpiderError> {
        let mut session = self.crawl(cancel).await;
        let written = sink.flush(&self.site, session.records()).await?;
        session.transition(SessionState::Closed);
        info!("Saved {} items for {}", written, self.site);

        Ok(CrawlReport {
            site: self.site.clone(),
            records: written,
            pages_fetched: session.pages_fetched(),
            pages_failed: session.pages_failed(),
            duplicates: session.duplicates(),
            cancelled: cancel.is_cancelled(),
        })
    }
}

#[cfg(test)]
#[path = "crawl_service_test.rs"]
mod tests;
