// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use std::time::Duration;

/// 限速配置
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// 基础请求间隔，同时是自适应限速的下限
    pub download_delay: Duration,
    /// 是否在基础间隔上随机抖动（0.5x - 1.5x）
    pub randomize: bool,
    /// 是否启用自适应限速
    pub auto_throttle: bool,
    /// 自适应限速的初始间隔
    pub start_delay: Duration,
    /// 自适应限速的最大间隔
    pub max_delay: Duration,
    /// 目标并发请求数
    pub target_concurrency: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            download_delay: Duration::from_secs(3),
            randomize: true,
            auto_throttle: true,
            start_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            target_concurrency: 1.0,
        }
    }
}

/// 自适应限速器
///
/// 根据响应延迟调整请求间隔：目标间隔为 `latency / target_concurrency`，
/// 新间隔取当前间隔与目标间隔的均值。失败时间隔翻倍，直到最大值。
#[derive(Debug)]
pub struct AutoThrottle {
    config: ThrottleConfig,
    current: Mutex<Duration>,
}

impl AutoThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        let initial = if config.auto_throttle {
            config.start_delay.max(config.download_delay)
        } else {
            config.download_delay
        };
        Self {
            current: Mutex::new(initial.min(config.max_delay.max(config.download_delay))),
            config,
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// 当前请求间隔（未加抖动）
    pub fn current_delay(&self) -> Duration {
        *self.current.lock()
    }

    /// 下一次请求前应等待的时间
    pub fn next_delay(&self) -> Duration {
        let delay = self.current_delay();
        if self.config.randomize && !delay.is_zero() {
            delay.mul_f64(rand::random_range(0.5..1.5))
        } else {
            delay
        }
    }

    fn floor(&self) -> Duration {
        self.config.download_delay
    }

    fn ceiling(&self) -> Duration {
        self.config.max_delay.max(self.floor())
    }

    /// 记录一次完成的响应
    ///
    /// 非成功响应不会让间隔变小。
    pub fn record_response(&self, latency: Duration, success: bool) {
        if !self.config.auto_throttle {
            return;
        }
        let target = latency.div_f64(self.config.target_concurrency.max(0.01));

        let mut current = self.current.lock();
        let averaged = (*current + target) / 2;
        let next = averaged.max(target).clamp(self.floor(), self.ceiling());

        if !success && next < *current {
            return;
        }
        *current = next;
    }

    /// 记录一次暂时性失败，间隔向最大值退避
    pub fn record_failure(&self) {
        if !self.config.auto_throttle {
            return;
        }
        let mut current = self.current.lock();
        let base = if current.is_zero() {
            self.config.start_delay
        } else {
            *current
        };
        *current = (base * 2).clamp(self.floor(), self.ceiling());
    }
}
