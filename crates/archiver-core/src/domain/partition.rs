//! 아카이브 파티션과 원격 파티션 인덱스.
//!
//! 파티션 하나가 아카이브 파일 하나에 대응합니다. 파일명은
//! `{exchange}_{data_type}_{frequency}_{timeframe}-{YYYYMMDD}.tar` 형식이며,
//! 원격 저장소에서는 월 단위 버킷(`YYYYMM`)에 배치됩니다.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{CoreError, CoreResult, Timeframe, TimeWindow};

/// 수집 데이터 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 캔들스틱
    Kline,
    /// 체결
    Trade,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Kline => "kline",
            DataType::Trade => "trade",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kline" | "klines" | "ohlcv" => Ok(DataType::Kline),
            "trade" | "trades" => Ok(DataType::Trade),
            _ => Err(CoreError::Parse(format!("Unknown data type: {}", s))),
        }
    }
}

/// 파티션 주기.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// 일 단위
    Daily,
    /// 주 단위 (월요일 시작)
    Weekly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        }
    }

    /// 파티션 하나가 덮는 일수.
    pub fn days(&self) -> u64 {
        match self {
            Frequency::Daily => 1,
            Frequency::Weekly => 7,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "d" | "1d" => Ok(Frequency::Daily),
            "weekly" | "w" | "1w" => Ok(Frequency::Weekly),
            _ => Err(CoreError::Parse(format!("Unknown frequency: {}", s))),
        }
    }
}

/// 아카이브 파티션 식별자.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    /// 거래소 이름 (소문자)
    pub exchange: String,
    pub data_type: DataType,
    pub frequency: Frequency,
    pub timeframe: Timeframe,
    /// 파티션 시작 날짜 (주간 파티션은 해당 주의 월요일)
    pub date: NaiveDate,
}

impl Partition {
    /// 파티션을 생성합니다. 주간 파티션은 날짜를 해당 주의 월요일로 맞춥니다.
    pub fn new(
        exchange: impl Into<String>,
        data_type: DataType,
        frequency: Frequency,
        timeframe: Timeframe,
        date: NaiveDate,
    ) -> Self {
        let date = match frequency {
            Frequency::Daily => date,
            Frequency::Weekly => week_start(date),
        };
        Self {
            exchange: exchange.into().to_lowercase(),
            data_type,
            frequency,
            timeframe,
            date,
        }
    }

    /// 일간 파티션.
    pub fn daily(
        exchange: impl Into<String>,
        data_type: DataType,
        timeframe: Timeframe,
        date: NaiveDate,
    ) -> Self {
        Self::new(exchange, data_type, Frequency::Daily, timeframe, date)
    }

    /// 주간 파티션.
    pub fn weekly(
        exchange: impl Into<String>,
        data_type: DataType,
        timeframe: Timeframe,
        date: NaiveDate,
    ) -> Self {
        Self::new(exchange, data_type, Frequency::Weekly, timeframe, date)
    }

    /// 파티션이 끝나는 날짜 (미포함).
    pub fn end_date(&self) -> NaiveDate {
        self.date + Days::new(self.frequency.days())
    }

    /// 수집 윈도우 `[date, end_date)` (UTC).
    pub fn window(&self) -> CoreResult<TimeWindow> {
        TimeWindow::from_dates(self.date, self.end_date())
    }

    /// 파일명 접두사.
    pub fn filename_prefix(&self) -> String {
        format!(
            "{}_{}_{}_{}-{}",
            self.exchange,
            self.data_type,
            self.frequency,
            self.timeframe,
            self.date.format("%Y%m%d")
        )
    }

    pub fn csv_filename(&self) -> String {
        format!("{}.csv", self.filename_prefix())
    }

    pub fn archive_filename(&self) -> String {
        format!("{}.tar", self.filename_prefix())
    }

    /// 작업 디렉토리 안의 CSV 경로.
    pub fn csv_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(self.csv_filename())
    }

    /// 작업 디렉토리 안의 아카이브 경로.
    pub fn archive_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(self.archive_filename())
    }

    /// 원격 저장소 버킷 키 (월 단위, `YYYYMM`).
    ///
    /// 파일명의 날짜보다 거친 단위로, 한 버킷에 여러 파티션이 들어갑니다.
    pub fn partition_key(&self) -> String {
        self.date.format("%Y%m").to_string()
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename_prefix())
    }
}

/// 날짜가 속한 ISO 주의 월요일.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// 원격 저장소에 있는 아카이브 파일 메타데이터.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMeta {
    /// 파일명 (예: `binance_kline_daily_1m-20230101.tar`)
    pub name: String,
    /// 버킷 키
    #[serde(default)]
    pub partition_key: Option<String>,
    /// 크기 (bytes)
    #[serde(default)]
    pub size: u64,
    /// 최종 수정 시각
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl ArchiveMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_key: None,
            size: 0,
            modified: None,
        }
    }
}

/// 이미 아카이브된 파티션의 스냅샷 (파일명 → 메타데이터).
#[derive(Debug, Clone, Default)]
pub struct PartitionIndex {
    entries: HashMap<String, ArchiveMeta>,
}

impl PartitionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entries.contains_key(filename)
    }

    pub fn get(&self, filename: &str) -> Option<&ArchiveMeta> {
        self.entries.get(filename)
    }

    pub fn insert(&mut self, meta: ArchiveMeta) {
        self.entries.insert(meta.name.clone(), meta);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 파일명 순으로 정렬된 항목.
    pub fn sorted(&self) -> Vec<&ArchiveMeta> {
        let mut entries: Vec<&ArchiveMeta> = self.entries.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

impl FromIterator<ArchiveMeta> for PartitionIndex {
    fn from_iter<I: IntoIterator<Item = ArchiveMeta>>(iter: I) -> Self {
        let mut index = Self::new();
        for meta in iter {
            index.insert(meta);
        }
        index
    }
}
