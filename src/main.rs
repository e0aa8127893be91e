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

use jobcrawl::application::use_cases::crawl_runner::CrawlRunner;
use jobcrawl::config::settings::Settings;
use jobcrawl::domain::services::site_registry;
use jobcrawl::engines::reqwest_engine::ReqwestEngine;
use jobcrawl::infrastructure::storage::LocalJsonSink;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use jobcrawl::utils::telemetry;

/// 主函数
///
/// 加载配置与站点清单，并发爬取所有站点并写入结果。
/// 只有配置或清单无法加载时以非零状态退出。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Arc::new(Settings::new()?);

    // 2. Initialize logging
    telemetry::init_telemetry(settings.logging.json);
    info!("Starting jobcrawl...");

    // 3. Load the site manifest
    let registry = site_registry::global(&settings.manifest.path)?;
    info!("Site registry loaded with {} sites", registry.len());

    // 4. Build fetcher and sink
    let fetcher = Arc::new(ReqwestEngine::new(settings.crawler.obey_robots));
    let sink = Arc::new(LocalJsonSink::new(&settings.output.dir));

    // 5. Ctrl-C stops every session between fetches
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl-C, stopping crawl and saving partial results");
            signal_token.cancel();
        }
    });

    // 6. Run
    let runner = CrawlRunner::new(
        registry,
        fetcher,
        Arc::clone(&sink),
        Arc::clone(&settings),
    );
    let sites = runner.site_names();
    let summary = runner.run(&sites, cancel).await;
    summary.log();

    if settings.output.summary {
        match sink.write_summary(&summary).await {
            Ok(path) => info!("Summary written to {}", path.display()),
            Err(e) => error!("Failed to write summary: {}", e),
        }
    }

    Ok(())
}
