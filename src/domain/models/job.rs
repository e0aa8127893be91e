// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 未解析到地点时的默认值
pub const DEFAULT_LOCATION: &str = "Remote";

/// 未解析到薪资时的默认值
pub const DEFAULT_SALARY: &str = "Not specified";

/// 原始记录
///
/// 提取器针对单个职位容器产出的字段映射，值为 `None` 表示选择器未命中。
/// 仅在提取与规范化之间短暂存在。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    /// 清单未配置描述选择器时为空字符串
    pub description: Option<String>,
    /// 已解析为绝对地址的职位链接
    pub url: String,
    /// 容器内没有可用链接、`url` 回退为页面地址时为 true
    pub url_is_fallback: bool,
}

/// 职位记录
///
/// 规范化后的最终实体，追加到会话后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// 职位标题
    pub job_title: Option<String>,
    /// 公司名称
    pub company: Option<String>,
    /// 职位的绝对URL
    pub url: String,
    /// 职位描述
    pub description: String,
    /// 工作地点，缺省为 "Remote"
    pub location: String,
    /// 薪资，缺省为 "Not specified"
    pub salary: String,
    /// 来源站点名称
    pub source: String,
    /// 抓取时间
    pub crawled_at: DateTime<Utc>,
}
