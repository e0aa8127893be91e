// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{board_registry, fast_settings, listing_page, mount_page};
use jobcrawl::domain::models::job::JobRecord;
use jobcrawl::domain::models::session::SessionState;
use jobcrawl::domain::services::crawl_service::CrawlService;
use jobcrawl::engines::reqwest_engine::ReqwestEngine;
use jobcrawl::infrastructure::storage::LocalJsonSink;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn spider(server: &MockServer, obey_robots: bool) -> CrawlService<ReqwestEngine> {
    let settings = fast_settings(obey_robots);
    let registry = board_registry("TestBoard", &format!("{}/jobs", server.uri()));
    CrawlService::from_registry(
        &registry,
        "testboard",
        Arc::new(ReqwestEngine::new(obey_robots)),
        Arc::new(settings.politeness()),
        settings.crawler.max_pages,
    )
    .unwrap()
}

#[tokio::test]
async fn test_next_page_link_triggers_second_fetch() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/jobs",
        listing_page(
            &[("/jobs/1", "Rust Engineer", "Acme"), ("/jobs/2", "SRE", "Globex")],
            Some("/jobs/page/2"),
        ),
        1,
    )
    .await;
    mount_page(
        &server,
        "/jobs/page/2",
        listing_page(&[("/jobs/3", "Data Engineer", "Initech")], None),
        1,
    )
    .await;

    let session = spider(&server, false)
        .crawl(&CancellationToken::new())
        .await;

    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(session.pages_fetched(), 2);
    let titles: Vec<_> = session
        .records()
        .iter()
        .map(|r| r.job_title.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(titles, vec!["Rust Engineer", "SRE", "Data Engineer"]);
}

#[tokio::test]
async fn test_page_without_next_link_completes_after_one_fetch() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/jobs",
        listing_page(&[("/jobs/1", "Rust Engineer", "Acme")], None),
        1,
    )
    .await;

    let session = spider(&server, false)
        .crawl(&CancellationToken::new())
        .await;

    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(session.pages_fetched(), 1);
    assert_eq!(session.len(), 1);
}

#[tokio::test]
async fn test_records_hold_invariants() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/jobs",
        listing_page(
            &[
                ("/jobs/1", "Rust Engineer", "Acme"),
                ("https://elsewhere.test/apply", "", ""),
            ],
            None,
        ),
        1,
    )
    .await;

    let session = spider(&server, false)
        .crawl(&CancellationToken::new())
        .await;

    assert_eq!(session.len(), 2);
    for record in session.records() {
        assert_eq!(record.source, "TestBoard");
        assert_eq!(record.location, "Remote");
        assert_eq!(record.salary, "Not specified");
        assert_eq!(record.description, "");
        assert!(Url::parse(&record.url).is_ok());
    }
    assert_eq!(
        session.records()[0].url,
        format!("{}/jobs/1", server.uri())
    );
    assert_eq!(session.records()[1].job_title, None);
}

#[tokio::test]
async fn test_three_503s_abandon_page_and_keep_earlier_records() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/jobs",
        listing_page(
            &[("/jobs/1", "Rust Engineer", "Acme"), ("/jobs/2", "SRE", "Globex")],
            Some("/jobs/page/2"),
        ),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/jobs/page/2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let output = tempfile::tempdir().unwrap();
    let sink = LocalJsonSink::new(output.path());
    let report = spider(&server, false)
        .run(&sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.records, 2);

    let content = std::fs::read_to_string(sink.artifact_path("TestBoard")).unwrap();
    let saved: Vec<JobRecord> = serde_json::from_str(&content).unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|r| r.source == "TestBoard"));
}

#[tokio::test]
async fn test_timeouts_are_retried_as_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .expect(3)
        .mount(&server)
        .await;

    let session = spider(&server, false)
        .crawl(&CancellationToken::new())
        .await;

    assert_eq!(session.pages_failed(), 1);
    assert!(session.is_empty());
}

#[tokio::test]
async fn test_robots_disallowed_page_is_not_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /jobs/page/\n"),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/jobs",
        listing_page(&[("/jobs/1", "Rust Engineer", "Acme")], Some("/jobs/page/2")),
        1,
    )
    .await;
    mount_page(&server, "/jobs/page/2", listing_page(&[], None), 0).await;

    let session = spider(&server, true)
        .crawl(&CancellationToken::new())
        .await;

    assert_eq!(session.pages_fetched(), 1);
    assert_eq!(session.pages_failed(), 1);
    assert_eq!(session.len(), 1);
}

#[tokio::test]
async fn test_cancelled_run_flushes_what_it_has() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/jobs",
        listing_page(&[("/jobs/1", "Rust Engineer", "Acme")], None),
        0,
    )
    .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let output = tempfile::tempdir().unwrap();
    let sink = LocalJsonSink::new(output.path());
    let report = spider(&server, false).run(&sink, &cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.records, 0);
    let content = std::fs::read_to_string(sink.artifact_path("TestBoard")).unwrap();
    assert_eq!(content, "[]");
}
