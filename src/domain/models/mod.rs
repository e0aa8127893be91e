// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 站点配置（site）：站点名称、起始URL与选择器清单
/// - 职位记录（job）：提取得到的原始记录与规范化后的职位记录
/// - 爬取会话（session）：单个站点一次运行内的记录集合与状态机
pub mod job;
pub mod session;
pub mod site;
