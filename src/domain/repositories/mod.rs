// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义领域层的持久化抽象契约，具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 职位存储（job_sink）：按站点整体写入职位记录
pub mod job_sink;
