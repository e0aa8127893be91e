// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use jobcrawl::config::settings::Settings;
use jobcrawl::domain::services::site_registry::SiteRegistry;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 无延迟、短超时的测试配置
pub fn fast_settings(obey_robots: bool) -> Settings {
    Settings::from_toml_str(&format!(
        r#"
        [crawler]
        download_delay_ms = 0
        randomize_delay = false
        request_timeout_secs = 1
        obey_robots = {}

        [throttle]
        enabled = false
        "#,
        obey_robots
    ))
    .expect("test settings")
}

/// 指向测试服务器的单站点清单
pub fn board_registry(name: &str, start_url: &str) -> SiteRegistry {
    let manifest = json!({
        "static_sites": [{
            "name": name,
            "url": start_url,
            "selectors": {
                "job_container": "li.job",
                "job_title": ".title",
                "company": ".company",
                "location": ".region",
                "salary": ".salary",
                "description": ".summary",
                "next_page": "a.next"
            }
        }]
    });
    SiteRegistry::from_json(&manifest.to_string()).expect("test manifest")
}

/// 生成列表页，`jobs` 为 (链接, 标题, 公司)
pub fn listing_page(jobs: &[(&str, &str, &str)], next: Option<&str>) -> String {
    let items: String = jobs
        .iter()
        .map(|(href, title, company)| {
            format!(
                r#"<li class="job"><a href="{}"><span class="title">{}</span></a><span class="company">{}</span></li>"#,
                href, title, company
            )
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<a class="next" href="{}">Next</a>"#, href))
        .unwrap_or_default();
    format!(
        "<html><body><ul>{}</ul><div class=\"pagination\">{}</div></body></html>",
        items, next
    )
}

/// 挂载一个返回固定HTML的页面
pub async fn mount_page(server: &MockServer, page_path: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}
