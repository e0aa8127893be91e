// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{fast_settings, listing_page, mount_page};
use jobcrawl::application::use_cases::crawl_runner::{CrawlRunner, OutcomeStatus};
use jobcrawl::domain::models::job::JobRecord;
use jobcrawl::domain::services::site_registry::SiteRegistry;
use jobcrawl::engines::reqwest_engine::ReqwestEngine;
use jobcrawl::infrastructure::storage::{LocalJsonSink, SUMMARY_FILE};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

fn registry(server: &MockServer) -> SiteRegistry {
    let selectors = json!({
        "job_container": "li.job",
        "job_title": ".title",
        "company": ".company",
        "location": ".region",
        "salary": ".salary"
    });
    let manifest = json!({
        "static_sites": [
            {"name": "WeWorkRemotely", "url": format!("{}/wwr", server.uri()), "selectors": selectors},
        ],
        "js_heavy_sites": [
            {"name": "RemoteOK", "url": format!("{}/rok", server.uri()), "selectors": selectors},
        ]
    });
    SiteRegistry::from_json(&manifest.to_string()).unwrap()
}

#[tokio::test]
async fn test_run_writes_one_artifact_per_site_and_summary() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/wwr",
        listing_page(&[("/wwr/1", "New! Rust Engineer", "Acme")], None),
        1,
    )
    .await;
    mount_page(
        &server,
        "/rok",
        listing_page(&[("/remote-jobs/7", "", "")], None),
        1,
    )
    .await;

    let output = tempfile::tempdir().unwrap();
    let sink = Arc::new(LocalJsonSink::new(output.path()));
    let runner = CrawlRunner::new(
        Arc::new(registry(&server)),
        Arc::new(ReqwestEngine::new(false)),
        Arc::clone(&sink),
        Arc::new(fast_settings(false)),
    );

    let sites = vec![
        "WeWorkRemotely".to_string(),
        "Indeed".to_string(),
        "RemoteOK".to_string(),
    ];
    let summary = runner.run(&sites, CancellationToken::new()).await;

    let statuses: Vec<_> = summary.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            OutcomeStatus::Success,
            OutcomeStatus::Error,
            OutcomeStatus::Success
        ]
    );
    assert_eq!(summary.total_records(), 2);

    let wwr: Vec<JobRecord> = serde_json::from_str(
        &std::fs::read_to_string(sink.artifact_path("WeWorkRemotely")).unwrap(),
    )
    .unwrap();
    assert_eq!(wwr[0].job_title.as_deref(), Some("Rust Engineer"));
    assert_eq!(wwr[0].source, "WeWorkRemotely");

    let rok: Vec<JobRecord> = serde_json::from_str(
        &std::fs::read_to_string(sink.artifact_path("RemoteOK")).unwrap(),
    )
    .unwrap();
    assert_eq!(rok[0].job_title.as_deref(), Some("Unknown Title"));
    assert_eq!(rok[0].company.as_deref(), Some("Unknown Company"));
    assert_eq!(rok[0].url, format!("{}/remote-jobs/7", server.uri()));

    assert!(!sink.artifact_path("Indeed").exists());

    sink.write_summary(&summary).await.unwrap();
    let written: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(output.path().join(SUMMARY_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(written["results"][1]["site"], "Indeed");
    assert_eq!(written["results"][1]["status"], "error");
    assert_eq!(written["results"][0]["count"], 1);
}

#[tokio::test]
async fn test_unwritable_output_fails_only_that_run_step() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/wwr",
        listing_page(&[("/wwr/1", "Rust Engineer", "Acme")], None),
        1,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("output");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let runner = CrawlRunner::new(
        Arc::new(registry(&server)),
        Arc::new(ReqwestEngine::new(false)),
        Arc::new(LocalJsonSink::new(&blocker)),
        Arc::new(fast_settings(false)),
    );
    let summary = runner
        .run(&["WeWorkRemotely".to_string()], CancellationToken::new())
        .await;

    assert_eq!(summary.results[0].status, OutcomeStatus::Error);
    assert!(summary.results[0].error.is_some());
}
