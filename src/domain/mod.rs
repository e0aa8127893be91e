// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：站点配置、职位记录与爬取会话
/// - 仓库接口（repositories）：结果持久化抽象接口
/// - 服务（services）：提取、规范化与爬取流程
///
/// 领域层不依赖具体的存储实现。
pub mod models;
pub mod repositories;
pub mod services;
