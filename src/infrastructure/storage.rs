// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::domain::models::job::JobRecord;
use crate::domain::repositories::job_sink::{JobSink, SinkError};

/// 运行汇总文件名
pub const SUMMARY_FILE: &str = "crawl_summary.json";

/// 站点产物文件名：`<小写站点名>_jobs.json`
pub fn artifact_name(site_name: &str) -> String {
    let stem: String = site_name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_jobs.json", stem)
}

/// 本地 JSON 文件存储实现
///
/// 每个站点一个文件，写入时先写临时文件再重命名，失败不会破坏已有产物。
pub struct LocalJsonSink {
    base_path: PathBuf,
}

impl LocalJsonSink {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// 站点产物的完整路径
    pub fn artifact_path(&self, site_name: &str) -> PathBuf {
        self.base_path.join(artifact_name(site_name))
    }

    /// 以两空格缩进写入任意可序列化的值，整体覆盖同名文件
    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<PathBuf, SinkError> {
        let data = serde_json::to_vec_pretty(value)?;
        let full_path = self.base_path.join(file_name);
        let tmp_path = self.base_path.join(format!(".{}.tmp", file_name));

        // 确保目录存在
        fs::create_dir_all(&self.base_path).await?;

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        drop(file);

        if let Err(e) = fs::rename(&tmp_path, &full_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(full_path)
    }

    /// 写入运行汇总
    pub async fn write_summary<T: Serialize + ?Sized>(
        &self,
        summary: &T,
    ) -> Result<PathBuf, SinkError> {
        self.write_json(SUMMARY_FILE, summary).await
    }
}

#[async_trait]
impl JobSink for LocalJsonSink {
    async fn flush(&self, site_name: &str, records: &[JobRecord]) -> Result<usize, SinkError> {
        let path = self.write_json(&artifact_name(site_name), records).await?;
        tracing::debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(records.len())
    }
}

/// 测试用的内存存储实现
#[derive(Default)]
pub struct InMemorySink {
    data: Arc<RwLock<HashMap<String, Vec<JobRecord>>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取站点最近一次写入的记录
    pub async fn get(&self, site_name: &str) -> Option<Vec<JobRecord>> {
        self.data.read().await.get(&site_name.to_lowercase()).cloned()
    }

    /// 已写入的站点名称（小写）
    pub async fn sites(&self) -> Vec<String> {
        let mut sites: Vec<_> = self.data.read().await.keys().cloned().collect();
        sites.sort();
        sites
    }
}

#[async_trait]
impl JobSink for InMemorySink {
    async fn flush(&self, site_name: &str, records: &[JobRecord]) -> Result<usize, SinkError> {
        let mut map = self.data.write().await;
        map.insert(site_name.to_lowercase(), records.to_vec());
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(url: &str) -> JobRecord {
        JobRecord {
            job_title: Some("Rust Engineer".to_string()),
            company: None,
            url: url.to_string(),
            description: String::new(),
            location: "Remote".to_string(),
            salary: "Not specified".to_string(),
            source: "WeWorkRemotely".to_string(),
            crawled_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_artifact_name_is_lowercase_and_safe() {
        assert_eq!(artifact_name("WeWorkRemotely"), "weworkremotely_jobs.json");
        assert_eq!(artifact_name("Remote OK/EU"), "remote_ok_eu_jobs.json");
    }

    #[tokio::test]
    async fn test_flush_writes_pretty_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalJsonSink::new(dir.path());

        let written = sink
            .flush("WeWorkRemotely", &[record("https://a.test/1")])
            .await
            .unwrap();
        assert_eq!(written, 1);

        let content = std::fs::read_to_string(sink.artifact_path("WeWorkRemotely")).unwrap();
        assert!(content.starts_with("[\n  {"));
        let parsed: Vec<JobRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, vec![record("https://a.test/1")]);

        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        let fields: Vec<_> = value[0].as_object().unwrap().keys().cloned().collect();
        for name in [
            "job_title",
            "company",
            "url",
            "description",
            "location",
            "salary",
            "source",
            "crawled_at",
        ] {
            assert!(fields.contains(&name.to_string()), "missing {}", name);
        }
        assert!(value[0]["company"].is_null());
    }

    #[tokio::test]
    async fn test_double_flush_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalJsonSink::new(dir.path());
        let records = vec![record("https://a.test/1"), record("https://a.test/2")];

        sink.flush("demo", &records).await.unwrap();
        let first = std::fs::read(sink.artifact_path("demo")).unwrap();
        sink.flush("demo", &records).await.unwrap();
        let second = std::fs::read(sink.artifact_path("demo")).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_flush_overwrites_instead_of_appending() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalJsonSink::new(dir.path());

        sink.flush(
            "demo",
            &[record("https://a.test/1"), record("https://a.test/2")],
        )
        .await
        .unwrap();
        sink.flush("demo", &[record("https://a.test/3")]).await.unwrap();

        let content = std::fs::read_to_string(sink.artifact_path("demo")).unwrap();
        let parsed: Vec<JobRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].url, "https://a.test/3");
    }

    #[tokio::test]
    async fn test_empty_session_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalJsonSink::new(dir.path().join("nested/output"));

        assert_eq!(sink.flush("demo", &[]).await.unwrap(), 0);
        let content = std::fs::read_to_string(sink.artifact_path("demo")).unwrap();
        assert_eq!(content, "[]");
    }

    #[tokio::test]
    async fn test_unwritable_destination_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"file").unwrap();

        let sink = LocalJsonSink::new(&blocker);
        let result = sink.flush("demo", &[record("https://a.test/1")]).await;
        assert!(matches!(result, Err(SinkError::Io(_))));

        // other sites keep their artifacts
        let healthy = LocalJsonSink::new(dir.path());
        healthy.flush("other", &[record("https://a.test/1")]).await.unwrap();
        assert!(healthy.artifact_path("other").exists());
    }

    #[tokio::test]
    async fn test_in_memory_sink_keys_by_lowercase_site() {
        let sink = InMemorySink::new();
        sink.flush("RemoteOK", &[record("https://a.test/1")])
            .await
            .unwrap();

        assert_eq!(sink.get("remoteok").await.unwrap().len(), 1);
        assert_eq!(sink.sites().await, vec!["remoteok"]);
        assert!(sink.get("other").await.is_none());
    }
}
