// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;

use crate::domain::models::job::{JobRecord, RawRecord, DEFAULT_LOCATION, DEFAULT_SALARY};
use crate::domain::models::session::CrawlSession;

/// 记录清洗钩子
///
/// 站点通过钩子定制规范化结果，而不需要重写提取或爬取流程。
pub trait RecordHook: Send + Sync + Debug {
    /// 钩子名称
    fn name(&self) -> &'static str;

    /// 就地修改记录
    fn apply(&self, record: &mut JobRecord);
}

/// 去除标题中的营销标签，如 "New!"
#[derive(Debug, Clone)]
pub struct StripTitleTags {
    tags: Vec<String>,
}

impl StripTitleTags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

impl RecordHook for StripTitleTags {
    fn name(&self) -> &'static str {
        "strip_title_tags"
    }

    fn apply(&self, record: &mut JobRecord) {
        let Some(title) = record.job_title.take() else {
            return;
        };
        let stripped = self
            .tags
            .iter()
            .fold(title, |acc, tag| acc.replace(tag.as_str(), ""));
        let cleaned = stripped.trim();
        record.job_title = (!cleaned.is_empty()).then(|| cleaned.to_string());
    }
}

/// 远程职位站点：地点不含 "remote" 时统一标记为 Remote
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceRemoteLocation;

impl RecordHook for ForceRemoteLocation {
    fn name(&self) -> &'static str {
        "force_remote_location"
    }

    fn apply(&self, record: &mut JobRecord) {
        if !record.location.to_lowercase().contains("remote") {
            record.location = DEFAULT_LOCATION.to_string();
        }
    }
}

/// 标题或公司缺失时填入占位值
#[derive(Debug, Clone)]
pub struct FillMissingFields {
    pub job_title: String,
    pub company: String,
}

impl RecordHook for FillMissingFields {
    fn name(&self) -> &'static str {
        "fill_missing_fields"
    }

    fn apply(&self, record: &mut JobRecord) {
        if record.job_title.is_none() {
            record.job_title = Some(self.job_title.clone());
        }
        if record.company.is_none() {
            record.company = Some(self.company.clone());
        }
    }
}

/// 单调时钟
///
/// 保证同一会话内产生的时间戳不会倒退。
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    pub fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock();
        let now = match *last {
            Some(prev) if prev > Utc::now() => prev,
            _ => Utc::now(),
        };
        *last = Some(now);
        now
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 规范化管道
///
/// 把原始记录转换为职位记录：打时间戳、标记来源、填充默认值并执行站点钩子。
#[derive(Debug, Default)]
pub struct NormalizationPipeline {
    hooks: Vec<Arc<dyn RecordHook>>,
    clock: MonotonicClock,
}

impl NormalizationPipeline {
    pub fn new(hooks: Vec<Arc<dyn RecordHook>>) -> Self {
        Self {
            hooks,
            clock: MonotonicClock::default(),
        }
    }

    /// 规范化单条记录
    pub fn normalize(&self, raw: RawRecord, site_name: &str) -> JobRecord {
        let mut record = JobRecord {
            job_title: non_empty(raw.job_title),
            company: non_empty(raw.company),
            url: raw.url,
            description: raw.description.unwrap_or_default(),
            location: String::new(),
            salary: String::new(),
            source: site_name.to_string(),
            crawled_at: self.clock.now(),
        };
        record.location = non_empty(raw.location).unwrap_or_default();
        record.salary = non_empty(raw.salary).unwrap_or_default();
        Self::apply_defaults(&mut record);

        for hook in &self.hooks {
            hook.apply(&mut record);
        }

        // hooks may not break the record invariants
        Self::apply_defaults(&mut record);
        record.source = site_name.to_string();
        record
    }

    /// 规范化并追加到会话，返回记录是否被保留
    pub fn process(&self, raw: RawRecord, session: &mut CrawlSession) -> bool {
        let dedup = !raw.url_is_fallback;
        let record = self.normalize(raw, session.site());
        session.push(record, dedup)
    }

    fn apply_defaults(record: &mut JobRecord) {
        if record.location.trim().is_empty() {
            record.location = DEFAULT_LOCATION.to_string();
        }
        if record.salary.trim().is_empty() {
            record.salary = DEFAULT_SALARY.to_string();
        }
    }
}
