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

use crate::{
    config::settings::Settings,
    domain::{
        repositories::job_sink::JobSink,
        services::{
            crawl_service::{CrawlReport, CrawlService, SpiderError},
            site_registry::SiteRegistry,
        },
    },
    engines::traits::Fetcher,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 站点运行结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// 单个站点的运行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteOutcome {
    pub site: String,
    pub count: usize,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SiteOutcome {
    fn success(report: &CrawlReport) -> Self {
        Self {
            site: report.site.clone(),
            count: report.records,
            status: OutcomeStatus::Success,
            error: None,
        }
    }

    fn failure(site: &str, error: impl ToString) -> Self {
        Self {
            site: site.to_string(),
            count: 0,
            status: OutcomeStatus::Error,
            error: Some(error.to_string()),
        }
    }
}

/// 一次运行的汇总
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub results: Vec<SiteOutcome>,
}

impl RunSummary {
    /// 所有站点是否都成功
    pub fn is_success(&self) -> bool {
        self.results
            .iter()
            .all(|r| r.status == OutcomeStatus::Success)
    }

    pub fn total_records(&self) -> usize {
        self.results.iter().map(|r| r.count).sum()
    }

    /// 输出汇总日志
    pub fn log(&self) {
        for result in &self.results {
            match &result.error {
                None => info!("{}: {} jobs", result.site, result.count),
                Some(e) => error!("{}: failed ({})", result.site, e),
            }
        }
        info!(
            "Crawl finished: {} sites, {} jobs",
            self.results.len(),
            self.total_records()
        );
    }
}

/// 爬取运行器
///
/// 并发运行多个站点，每个站点是独立的会话，只共享只读的站点注册表。
/// 单个站点的配置、提取或存储错误只会让该站点失败。
pub struct CrawlRunner<F, S>
where
    F: Fetcher + 'static,
    S: JobSink + 'static,
{
    registry: Arc<SiteRegistry>,
    fetcher: Arc<F>,
    sink: Arc<S>,
    settings: Arc<Settings>,
}

impl<F, S> CrawlRunner<F, S>
where
    F: Fetcher + 'static,
    S: JobSink + 'static,
{
    pub fn new(
        registry: Arc<SiteRegistry>,
        fetcher: Arc<F>,
        sink: Arc<S>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            sink,
            settings,
        }
    }

    /// 本次要运行的站点：配置中指定的站点，或清单中的全部站点
    pub fn site_names(&self) -> Vec<String> {
        self.settings
            .sites
            .clone()
            .unwrap_or_else(|| self.registry.names())
    }

    /// 运行给定站点，结果按输入顺序排列
    pub async fn run(&self, sites: &[String], cancel: CancellationToken) -> RunSummary {
        info!("Starting crawl for {} sites", sites.len());

        let handles: Vec<_> = sites
            .iter()
            .map(|name| {
                let registry = Arc::clone(&self.registry);
                let fetcher = Arc::clone(&self.fetcher);
                let sink = Arc::clone(&self.sink);
                let politeness = Arc::new(self.settings.politeness());
                let max_pages = self.settings.crawler.max_pages;
                let name = name.clone();
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    let spider =
                        CrawlService::from_registry(&registry, &name, fetcher, politeness, max_pages);
                    match spider {
                        Ok(spider) => spider.run(sink.as_ref(), &cancel).await,
                        Err(e) => Err(e),
                    }
                })
            })
            .collect();

        let results = join_all(handles)
            .await
            .into_iter()
            .zip(sites)
            .map(|(joined, name)| match joined {
                Ok(Ok(report)) => SiteOutcome::success(&report),
                Ok(Err(e)) => {
                    log_failure(name, &e);
                    SiteOutcome::failure(name, e)
                }
                Err(e) => {
                    error!(site = %name, "Spider task panicked: {}", e);
                    SiteOutcome::failure(name, e)
                }
            })
            .collect();

        RunSummary {
            timestamp: Utc::now(),
            results,
        }
    }
}

fn log_failure(site: &str, error: &SpiderError) {
    match error {
        SpiderError::Config(_) => error!(site, "Skipping spider: {}", error),
        _ => error!(site, "Spider failed: {}", error),
    }
}
