// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::job::JobRecord;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum SinkError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 职位记录存储特质
///
/// 每个站点对应一个持久化产物，写入时整体覆盖，不做追加或合并。
#[async_trait]
pub trait JobSink: Send + Sync {
    /// 写入站点的全部记录，返回写入条数
    async fn flush(&self, site_name: &str, records: &[JobRecord]) -> Result<usize, SinkError>;
}
