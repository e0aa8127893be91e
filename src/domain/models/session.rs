// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::models::job::JobRecord;

/// 会话状态枚举
///
/// 单个站点爬取会话的生命周期：
/// Idle → Fetching → Extracting → (Paginating | Completed) → Closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// 尚未开始
    #[default]
    Idle,
    /// 等待页面响应
    Fetching,
    /// 正在提取页面内容
    Extracting,
    /// 已发现下一页并入队
    Paginating,
    /// 没有更多页面
    Completed,
    /// 已写入存储并关闭
    Closed,
}

impl SessionState {
    /// 判断状态转换是否合法
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Fetching)
                | (Idle, Completed)
                | (Fetching, Extracting)
                | (Fetching, Completed)
                | (Extracting, Paginating)
                | (Extracting, Completed)
                | (Paginating, Fetching)
                | (Paginating, Completed)
                | (Completed, Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Fetching => write!(f, "fetching"),
            SessionState::Extracting => write!(f, "extracting"),
            SessionState::Paginating => write!(f, "paginating"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for SessionState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(SessionState::Idle),
            "fetching" => Ok(SessionState::Fetching),
            "extracting" => Ok(SessionState::Extracting),
            "paginating" => Ok(SessionState::Paginating),
            "completed" => Ok(SessionState::Completed),
            "closed" => Ok(SessionState::Closed),
            _ => Err(()),
        }
    }
}

/// 爬取会话
///
/// 一个站点、一次运行内累积的职位记录，按页面抓取顺序及页面内文档顺序排列。
/// 由爬虫引擎独占，完成时写入存储后丢弃。
#[derive(Debug)]
pub struct CrawlSession {
    site: String,
    state: SessionState,
    records: Vec<JobRecord>,
    seen_urls: HashSet<String>,
    duplicates: usize,
    pages_fetched: usize,
    pages_failed: usize,
}

impl CrawlSession {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            state: SessionState::Idle,
            records: Vec::new(),
            seen_urls: HashSet::new(),
            duplicates: 0,
            pages_fetched: 0,
            pages_failed: 0,
        }
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 切换会话状态
    ///
    /// 非法转换只记录警告，不会中断会话。
    pub fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                site = %self.site,
                "Unexpected session transition {} -> {}",
                self.state,
                next
            );
        }
        tracing::debug!(site = %self.site, "Session {} -> {}", self.state, next);
        self.state = next;
    }

    /// 追加一条记录
    ///
    /// `dedup` 为 true 时按URL去重，重复记录被丢弃并返回 false。
    pub fn push(&mut self, record: JobRecord, dedup: bool) -> bool {
        if dedup && !self.seen_urls.insert(record.url.clone()) {
            self.duplicates += 1;
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn record_page_fetched(&mut self) {
        self.pages_fetched += 1;
    }

    pub fn record_page_failed(&mut self) {
        self.pages_failed += 1;
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn pages_failed(&self) -> usize {
        self.pages_failed
    }

    /// 取出全部记录，会话随之结束
    pub fn into_records(self) -> Vec<JobRecord> {
        self.records
    }
}
