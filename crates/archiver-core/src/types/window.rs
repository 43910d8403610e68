//! 반개구간 `[start, end)` 시간 윈도우.
//!
//! 모든 시각은 거래소 API의 기본 단위인 epoch 밀리초입니다.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CoreError, CoreResult};

/// 한 시간(밀리초). 체결 수집이 정체될 때 커서를 전진시키는 기본 간격.
pub const ONE_HOUR_MS: i64 = 3_600_000;

/// 하루(밀리초).
pub const ONE_DAY_MS: i64 = 24 * ONE_HOUR_MS;

/// 수집 대상 시간 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: i64,
    end: i64,
}

impl TimeWindow {
    /// 새 윈도우를 생성합니다. `start > end`이면 에러.
    pub fn new(start: i64, end: i64) -> CoreResult<Self> {
        if start > end {
            return Err(CoreError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// UTC 자정 기준 날짜 범위 `[start_date, end_date)`로 생성합니다.
    pub fn from_dates(start_date: NaiveDate, end_date: NaiveDate) -> CoreResult<Self> {
        Self::new(date_to_millis(start_date), date_to_millis(end_date))
    }

    /// 시작 시각 (포함).
    pub fn start(&self) -> i64 {
        self.start
    }

    /// 종료 시각 (미포함).
    pub fn end(&self) -> i64 {
        self.end
    }

    /// `start <= ts < end` 여부.
    pub fn contains(&self, ts: i64) -> bool {
        self.start <= ts && ts < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn duration_ms(&self) -> i64 {
        self.end - self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// UTC 자정의 epoch 밀리초.
pub fn date_to_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}
