// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 站点配置实体
///
/// 描述一个招聘站点的爬取清单：站点名称、起始URL以及选择器集合。
/// 由站点注册表在加载清单时创建，之后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// 站点名称，注册表中的唯一键（大小写不敏感）
    pub name: String,
    /// 起始URL
    #[serde(rename = "url")]
    pub start_url: String,
    /// 选择器清单
    pub selectors: SelectorManifest,
}

impl SiteConfig {
    /// 注册表使用的查找键
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// 选择器清单
///
/// 每个选择器都是CSS选择器字符串，由提取器针对HTML文档解释。
/// 字段选择器均相对于职位容器节点执行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorManifest {
    /// 职位容器选择器
    pub job_container: String,
    /// 职位标题选择器
    pub job_title: String,
    /// 公司名称选择器
    pub company: String,
    /// 工作地点选择器
    pub location: String,
    /// 薪资选择器
    pub salary: String,
    /// 职位描述选择器（可选）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 职位链接选择器，缺省为容器下的第一个 `a` 元素
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_link: Option<String>,
    /// 下一页链接选择器，缺省表示不翻页
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
}
