// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 提供领域层存储接口的具体实现：
/// - 存储（storage）：本地 JSON 文件存储与测试用的内存存储
///
/// 基础设施层依赖于领域层的抽象接口。
pub mod storage;
