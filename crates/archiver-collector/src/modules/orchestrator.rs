//! 파티션 아카이브 오케스트레이터.
//!
//! 파티션마다 다음 순서로 처리합니다:
//! 1. 확인: 원격 인덱스에 아카이브 파일명이 있으면 건너뜀
//! 2. 수집: CSV 싱크 + 버퍼 writer + 심볼 드라이버
//! 3. 압축: 단일 엔트리 tar.xz
//! 4. 업로드: 월 단위 버킷에 덮어쓰기
//! 5. 정리: 로컬 CSV/아카이브 삭제 (성공 여부와 무관)
//!
//! 파티션 하나가 실패하면 정리 후 실행 전체를 중단합니다.
//! 치명적 에러로 빠진 심볼이 있는 파티션은 업로드하지 않습니다.

use chrono::{Days, NaiveDate};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use archiver_core::{week_start, DataType, Frequency, Partition, PartitionIndex, TimeWindow};
use archiver_exchange::MarketDataSource;

use crate::config::{FetchConfig, OrchestratorConfig};
use crate::error::CollectorError;
use crate::modules::driver::{DriveReport, SymbolSetDriver};
use crate::modules::fetcher::{FetchPolicy, KlinePolicy, TradePolicy};
use crate::storage::archive::compress_blocking;
use crate::storage::{BufferedWriter, CsvSink, RemoteStore};
use crate::{CollectionStats, Result};

/// 파티션 하나의 처리 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionOutcome {
    /// 이미 원격에 존재
    Skipped,
    /// 수집, 압축, 업로드 완료
    Archived {
        records: usize,
        symbols: usize,
        archive_bytes: u64,
    },
}

/// 파티션 오케스트레이터.
pub struct PartitionOrchestrator {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn RemoteStore>,
    config: OrchestratorConfig,
    kline: FetchConfig,
    trade: FetchConfig,
}

impl PartitionOrchestrator {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn RemoteStore>,
        config: OrchestratorConfig,
        kline: FetchConfig,
        trade: FetchConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
            kline,
            trade,
        }
    }

    /// 날짜의 파티션 식별자.
    pub fn partition_for(&self, data_type: DataType, date: NaiveDate) -> Partition {
        Partition::new(
            self.source.name(),
            data_type,
            self.config.frequency,
            self.config.timeframe,
            date,
        )
    }

    /// `today` 기준으로 거꾸로 `count`개의 완료된 파티션.
    ///
    /// 일간은 어제부터, 주간은 지난 주(월요일 시작)부터 시작합니다.
    pub fn partitions(&self, data_type: DataType, today: NaiveDate, count: usize) -> Vec<Partition> {
        let step = self.config.frequency.days();
        let first = match self.config.frequency {
            Frequency::Daily => today - Days::new(1),
            Frequency::Weekly => week_start(today) - Days::new(7),
        };

        (0..count as u64)
            .map(|i| self.partition_for(data_type, first - Days::new(i * step)))
            .collect()
    }

    /// 최근 `count`개 파티션을 아카이브합니다.
    ///
    /// # Errors
    /// 파티션 처리 실패 시 `CollectorError::Partition`으로 중단합니다.
    pub async fn run(
        &self,
        data_type: DataType,
        count: usize,
        today: NaiveDate,
    ) -> Result<CollectionStats> {
        let started = Instant::now();
        let mut stats = CollectionStats::new();
        let partitions = self.partitions(data_type, today, count);
        stats.total = partitions.len();

        info!(
            data_type = %data_type,
            frequency = %self.config.frequency,
            partitions = partitions.len(),
            store = self.store.name(),
            "아카이브 시작"
        );

        let mut index = self.load_index().await?;

        for (idx, partition) in partitions.iter().enumerate() {
            if self.config.refresh_index && idx > 0 {
                index = self.load_index().await?;
            }

            info!(
                partition = %partition,
                progress = format!("{}/{}", idx + 1, partitions.len()),
                "파티션 처리"
            );

            match self.process(partition, &index).await {
                Ok(PartitionOutcome::Skipped) => stats.skipped += 1,
                Ok(PartitionOutcome::Archived { records, .. }) => {
                    stats.success += 1;
                    stats.total_records += records;
                    if records == 0 {
                        stats.empty += 1;
                    }
                }
                Err(e) => {
                    stats.errors += 1;
                    stats.elapsed = started.elapsed();
                    stats.log_summary("partition_archive");
                    error!(partition = %partition, error = %e, "파티션 아카이브 실패, 중단");
                    return Err(e.in_partition(partition.to_string()));
                }
            }
        }

        stats.elapsed = started.elapsed();
        stats.log_summary("partition_archive");
        Ok(stats)
    }

    /// 인덱스 확인 후 필요하면 아카이브합니다.
    async fn process(&self, partition: &Partition, index: &PartitionIndex) -> Result<PartitionOutcome> {
        let filename = partition.archive_filename();
        if index.contains(&filename) {
            info!(partition = %partition, file = %filename, "이미 아카이브됨, 건너뜀");
            return Ok(PartitionOutcome::Skipped);
        }
        self.archive_partition(partition).await
    }

    /// 파티션 하나를 수집, 압축, 업로드합니다. 로컬 파일은 항상 정리됩니다.
    pub async fn archive_partition(&self, partition: &Partition) -> Result<PartitionOutcome> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let csv_path = partition.csv_path(&self.config.work_dir);
        let archive_path = partition.archive_path(&self.config.work_dir);

        let result = self
            .fetch_compress_upload(partition, &csv_path, &archive_path)
            .await;
        cleanup(&[csv_path.as_path(), archive_path.as_path()]).await;
        result
    }

    async fn fetch_compress_upload(
        &self,
        partition: &Partition,
        csv_path: &Path,
        archive_path: &Path,
    ) -> Result<PartitionOutcome> {
        let report = self.fetch_into(partition, csv_path, None).await?;
        // 빠진 심볼이 있는 파티션이 인덱스에 오르면 다시 수집되지 않는다
        if !report.failed_symbols.is_empty() {
            warn!(
                partition = %partition,
                failed = ?report.failed_symbols,
                "수집 실패 심볼 있음, 업로드하지 않음"
            );
            return Err(CollectorError::IncompleteFetch {
                failed: report.failed_symbols,
            });
        }

        let archive_bytes = compress_blocking(
            csv_path.to_path_buf(),
            archive_path.to_path_buf(),
            self.config.compression_level,
        )
        .await?;

        let key = partition.partition_key();
        let stored = self.store.upload(archive_path, &key, true).await?;
        if !stored {
            return Err(CollectorError::Upload(format!(
                "{} 저장소가 {}/{}를 저장하지 않음",
                self.store.name(),
                key,
                partition.archive_filename()
            )));
        }

        info!(
            partition = %partition,
            partition_key = %key,
            records = report.records,
            archive_bytes,
            "업로드 완료"
        );

        Ok(PartitionOutcome::Archived {
            records: report.records,
            symbols: report.symbols_driven,
            archive_bytes,
        })
    }

    /// 로컬 CSV로만 수집합니다 (압축, 업로드, 정리 없음).
    ///
    /// `symbols`가 주어지면 해당 심볼만 수집합니다.
    pub async fn export_partition(
        &self,
        partition: &Partition,
        symbols: Option<&[String]>,
    ) -> Result<(PathBuf, DriveReport)> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let csv_path = partition.csv_path(&self.config.work_dir);
        let report = self.fetch_into(partition, &csv_path, symbols).await?;
        if !report.failed_symbols.is_empty() {
            warn!(
                partition = %partition,
                failed = ?report.failed_symbols,
                "일부 심볼 수집 실패, CSV에 빠진 구간 있음"
            );
        }

        info!(
            partition = %partition,
            path = %csv_path.display(),
            records = report.records,
            "CSV 내보내기 완료"
        );
        Ok((csv_path, report))
    }

    async fn fetch_into(
        &self,
        partition: &Partition,
        csv_path: &Path,
        symbols: Option<&[String]>,
    ) -> Result<DriveReport> {
        let window = partition.window()?;
        match partition.data_type {
            DataType::Kline => {
                let policy =
                    KlinePolicy::new(self.source.clone(), partition.timeframe, self.kline.clone());
                self.collect(&policy, window, csv_path, self.kline.flush_threshold, symbols)
                    .await
            }
            DataType::Trade => {
                let policy = TradePolicy::new(self.source.clone(), self.trade.clone());
                self.collect(&policy, window, csv_path, self.trade.flush_threshold, symbols)
                    .await
            }
        }
    }

    async fn collect<P: FetchPolicy>(
        &self,
        policy: &P,
        window: TimeWindow,
        csv_path: &Path,
        flush_threshold: usize,
        symbols: Option<&[String]>,
    ) -> Result<DriveReport> {
        let sink = CsvSink::<P::Record>::create(csv_path)?;
        let mut writer = BufferedWriter::new(window, flush_threshold, Box::new(sink));
        let driver = SymbolSetDriver::new(self.source.clone()).with_progress(self.config.show_progress);

        let report = match symbols {
            Some(symbols) => driver.drive_symbols(policy, symbols, window, &mut writer).await?,
            None => driver.drive(policy, window, &mut writer).await?,
        };
        writer.close()?;

        debug!(
            path = %csv_path.display(),
            flushed = writer.flushed_records(),
            dropped = writer.dropped_records(),
            "CSV 기록 완료"
        );
        Ok(report)
    }

    async fn load_index(&self) -> Result<PartitionIndex> {
        let index = self.store.partition_index().await?;
        info!(store = self.store.name(), entries = index.len(), "파티션 인덱스 조회");
        Ok(index)
    }
}

/// 로컬 파일 삭제. 실패는 로그만 남깁니다.
async fn cleanup(paths: &[&Path]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "삭제"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "로컬 파일 삭제 실패"),
        }
    }
}
