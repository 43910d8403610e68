//! 지수 백오프 재시도 정책.
//!
//! 연속 실패마다 대기 시간이 `multiplier` 배로 늘고 `max_delay_ms`에서 멈춥니다.
//! 성공한 페이지를 받으면 `reset()`으로 처음 지연으로 돌아갑니다.
//! 재시도 횟수 자체는 호출 측의 반복 상한이 제한합니다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ExchangeError;

/// 백오프 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 첫 재시도 전 대기 (밀리초)
    pub initial_delay_ms: u64,
    /// 최대 대기 (밀리초)
    pub max_delay_ms: u64,
    /// 실패마다 곱해지는 배수
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// 대기 없이 즉시 재시도 (테스트용).
    pub fn immediate() -> Self {
        Self {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 1.0,
        }
    }

    /// `attempt`번째(0부터) 재시도의 대기 시간.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let delay = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(delay as u64)
    }
}

/// 연속 실패 횟수를 추적하는 백오프 상태.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// 연속 실패 횟수.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// 다음 대기 시간을 반환하고 실패 횟수를 올립니다.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.config.delay_for_attempt(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// 에러가 요구하는 최소 대기(요청 한도 등)를 반영한 다음 대기 시간.
    ///
    /// 에러 힌트도 `max_delay_ms`를 넘지 않습니다.
    pub fn next_delay_for(&mut self, error: &ExchangeError) -> Duration {
        let delay = self.next_delay();
        let hinted = error
            .retry_delay_ms()
            .map(|ms| Duration::from_millis(ms.min(self.config.max_delay_ms)))
            .unwrap_or_default();
        delay.max(hinted)
    }

    /// 성공 후 초기화.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
