// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 爬取服务（crawl_service）：驱动单个站点的抓取、提取与翻页循环
/// - 提取服务（extraction_service）：按选择器清单从页面中提取原始记录
/// - 规范化服务（normalization_service）：为原始记录打时间戳、标记来源并执行站点钩子
/// - 站点扩展点（site_profiles）：各站点相对基础行为的差异
/// - 站点注册表（site_registry）：加载并索引站点清单
pub mod crawl_service;
pub mod extraction_service;
pub mod normalization_service;
pub mod site_profiles;
pub mod site_registry;
