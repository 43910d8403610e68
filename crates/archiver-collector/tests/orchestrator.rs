//! 파티션 오케스트레이터 통합 테스트 (로컬 디렉토리 저장소).

mod common;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;

use archiver_collector::modules::{PartitionOrchestrator, PartitionOutcome};
use archiver_collector::storage::archive::read_single_entry;
use archiver_collector::storage::{LocalDirStore, RemoteStore};
use archiver_collector::{CollectorError, FetchConfig, OrchestratorConfig};
use archiver_core::{DataType, Frequency, PartitionIndex, Timeframe, ONE_DAY_MS};
use archiver_exchange::ExchangeError;

use common::{bars, trade, MockSource, JAN_1_2023, MINUTE_MS};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn config(work_dir: &Path) -> OrchestratorConfig {
    OrchestratorConfig {
        work_dir: work_dir.to_path_buf(),
        show_progress: false,
        ..Default::default()
    }
}

/// 매일 00:00 부터 3개 캔들을 가진 소스
fn three_bars_a_day() -> MockSource {
    MockSource::new(&["BTC/USDT", "BTC/USDT:USDT"]).with_klines(|symbol, since, limit| {
        let day_start = since - since.rem_euclid(ONE_DAY_MS);
        Ok(bars(symbol, since, day_start + 3 * MINUTE_MS, MINUTE_MS, limit))
    })
}

fn orchestrator(
    source: Arc<MockSource>,
    store: Arc<dyn RemoteStore>,
    config: OrchestratorConfig,
) -> PartitionOrchestrator {
    PartitionOrchestrator::new(
        source,
        store,
        config,
        FetchConfig::kline_defaults(),
        FetchConfig::trade_defaults(),
    )
}

fn work_dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

#[test]
fn test_daily_partitions_walk_back_from_yesterday() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        Arc::new(MockSource::new(&[])),
        Arc::new(LocalDirStore::new(dir.path())),
        config(dir.path()),
    );

    let names: Vec<String> = orch
        .partitions(DataType::Kline, date(2023, 1, 10), 3)
        .iter()
        .map(|p| p.archive_filename())
        .collect();

    assert_eq!(
        names,
        vec![
            "binance_kline_daily_1m-20230109.tar",
            "binance_kline_daily_1m-20230108.tar",
            "binance_kline_daily_1m-20230107.tar",
        ]
    );
}

#[test]
fn test_weekly_partitions_start_at_last_completed_week() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        Arc::new(MockSource::new(&[])),
        Arc::new(LocalDirStore::new(dir.path())),
        OrchestratorConfig {
            frequency: Frequency::Weekly,
            ..config(dir.path())
        },
    );

    // 2023-01-11 은 수요일
    let partitions = orch.partitions(DataType::Trade, date(2023, 1, 11), 2);
    assert_eq!(partitions[0].date, date(2023, 1, 2));
    assert_eq!(partitions[1].date, date(2022, 12, 26));
    assert_eq!(
        partitions[0].archive_filename(),
        "binance_trade_weekly_1m-20230102.tar"
    );
}

#[tokio::test]
async fn test_archived_partition_is_skipped_without_fetching() {
    let work = tempfile::tempdir().unwrap();
    let remote = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(remote.path().join("202301")).unwrap();
    std::fs::write(
        remote
            .path()
            .join("202301/binance_kline_daily_1m-20230101.tar"),
        b"done",
    )
    .unwrap();

    let source = Arc::new(three_bars_a_day());
    let orch = orchestrator(
        source.clone(),
        Arc::new(LocalDirStore::new(remote.path())),
        config(work.path()),
    );

    let stats = orch.run(DataType::Kline, 1, date(2023, 1, 2)).await.unwrap();

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.success, 0);
    assert_eq!(source.fetch_calls(), 0);
    assert_eq!(source.list_calls(), 0);
}

#[tokio::test]
async fn test_second_run_uploads_nothing() {
    let work = tempfile::tempdir().unwrap();
    let remote = tempfile::tempdir().unwrap();
    let source = Arc::new(three_bars_a_day());
    let orch = orchestrator(
        source.clone(),
        Arc::new(LocalDirStore::new(remote.path())),
        config(work.path()),
    );

    let first = orch.run(DataType::Kline, 3, date(2023, 1, 4)).await.unwrap();
    assert_eq!(first.success, 3);
    assert_eq!(first.total_records, 9);
    let calls_after_first = source.fetch_calls();

    let second = orch.run(DataType::Kline, 3, date(2023, 1, 4)).await.unwrap();
    assert_eq!(second.skipped, 3);
    assert_eq!(second.success, 0);
    assert_eq!(source.fetch_calls(), calls_after_first);
}

#[tokio::test]
async fn test_archive_contains_window_rows_and_work_dir_is_cleaned() {
    let work = tempfile::tempdir().unwrap();
    let remote = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        Arc::new(three_bars_a_day()),
        Arc::new(LocalDirStore::new(remote.path())),
        config(work.path()),
    );

    let stats = orch.run(DataType::Kline, 1, date(2023, 1, 2)).await.unwrap();
    assert_eq!(stats.success, 1);

    let uploaded = remote
        .path()
        .join("202301/binance_kline_daily_1m-20230101.tar");
    let (name, content) = read_single_entry(&uploaded).unwrap();
    assert_eq!(name, "binance_kline_daily_1m-20230101.csv");

    let text = String::from_utf8(content).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "symbol,timestamp,open,close,low,high,volume");
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with(&format!("BTC/USDT,{},", JAN_1_2023)));

    assert!(work_dir_is_empty(work.path()));
}

#[tokio::test]
async fn test_partition_without_data_is_archived_as_empty() {
    let work = tempfile::tempdir().unwrap();
    let remote = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        Arc::new(MockSource::new(&["BTC/USDT"])),
        Arc::new(LocalDirStore::new(remote.path())),
        config(work.path()),
    );

    let stats = orch.run(DataType::Trade, 1, date(2023, 1, 2)).await.unwrap();

    assert_eq!(stats.success, 1);
    assert_eq!(stats.empty, 1);
    assert!(remote
        .path()
        .join("202301/binance_trade_daily_1m-20230101.tar")
        .exists());
}

/// 업로드를 항상 거부하는 저장소
struct RefusingStore;

#[async_trait]
impl RemoteStore for RefusingStore {
    fn name(&self) -> &str {
        "refusing"
    }

    async fn partition_index(&self) -> archiver_collector::Result<PartitionIndex> {
        Ok(PartitionIndex::new())
    }

    async fn upload(
        &self,
        _local_path: &Path,
        _partition_key: &str,
        _overwrite: bool,
    ) -> archiver_collector::Result<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_refused_upload_aborts_run_and_cleans_up() {
    let work = tempfile::tempdir().unwrap();
    let source = Arc::new(three_bars_a_day());
    let orch = orchestrator(source.clone(), Arc::new(RefusingStore), config(work.path()));

    let err = orch
        .run(DataType::Kline, 3, date(2023, 1, 4))
        .await
        .unwrap_err();

    match err {
        CollectorError::Partition { partition, source } => {
            assert_eq!(partition, "binance_kline_daily_1m-20230103");
            assert!(matches!(*source, CollectorError::Upload(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    // 첫 파티션에서 중단
    assert_eq!(source.list_calls(), 1);
    assert!(work_dir_is_empty(work.path()));
}

#[tokio::test]
async fn test_partition_with_failed_kline_symbol_is_not_uploaded() {
    let work = tempfile::tempdir().unwrap();
    let remote = tempfile::tempdir().unwrap();
    let source = Arc::new(MockSource::new(&["AAA/USDT", "BBB/USDT"]).with_klines(
        |symbol, since, limit| {
            if symbol == "AAA/USDT" {
                return Err(ExchangeError::ApiError {
                    code: 403,
                    message: "<html>Forbidden</html>".into(),
                });
            }
            let day_start = since - since.rem_euclid(ONE_DAY_MS);
            Ok(bars(symbol, since, day_start + 3 * MINUTE_MS, MINUTE_MS, limit))
        },
    ));
    let orch = orchestrator(
        source.clone(),
        Arc::new(LocalDirStore::new(remote.path())),
        config(work.path()),
    );

    let err = orch
        .run(DataType::Kline, 1, date(2023, 1, 2))
        .await
        .unwrap_err();
    match err {
        CollectorError::Partition { partition, source } => {
            assert_eq!(partition, "binance_kline_daily_1m-20230101");
            match *source {
                CollectorError::IncompleteFetch { failed } => {
                    assert_eq!(failed, vec!["AAA/USDT".to_string()]);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(work_dir_is_empty(remote.path()));
    assert!(work_dir_is_empty(work.path()));

    // 인덱스에 없으므로 다음 실행이 다시 수집한다
    let calls_after_first = source.kline_calls().len();
    let _ = orch.run(DataType::Kline, 1, date(2023, 1, 2)).await;
    assert!(source.kline_calls().len() > calls_after_first);
    assert_eq!(source.list_calls(), 2);
}

#[tokio::test]
async fn test_export_keeps_local_csv_for_selected_symbols() {
    let work = tempfile::tempdir().unwrap();
    let remote = tempfile::tempdir().unwrap();
    let source = Arc::new(MockSource::new(&["BTC/USDT", "ETH/USDT"]).with_trades(
        |symbol, since, _| {
            if since == JAN_1_2023 {
                Ok(vec![trade(symbol, "9", JAN_1_2023 + 500)])
            } else {
                Ok(vec![])
            }
        },
    ));
    let orch = orchestrator(
        source.clone(),
        Arc::new(LocalDirStore::new(remote.path())),
        config(work.path()),
    );

    let partition = orch.partition_for(DataType::Trade, date(2023, 1, 1));
    let symbols = vec!["ETH/USDT".to_string()];
    let (path, report) = orch
        .export_partition(&partition, Some(symbols.as_slice()))
        .await
        .unwrap();

    assert_eq!(report.records, 1);
    assert_eq!(source.list_calls(), 0);
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("ETH/USDT,9,"));
    assert!(!content.contains("BTC/USDT"));
    assert!(work_dir_is_empty(remote.path()));
}

#[tokio::test]
async fn test_archive_partition_reports_outcome() {
    let work = tempfile::tempdir().unwrap();
    let remote = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        Arc::new(three_bars_a_day()),
        Arc::new(LocalDirStore::new(remote.path())),
        OrchestratorConfig {
            timeframe: Timeframe::M5,
            ..config(work.path())
        },
    );

    let partition = orch.partition_for(DataType::Kline, date(2023, 2, 28));
    let outcome = orch.archive_partition(&partition).await.unwrap();

    match outcome {
        PartitionOutcome::Archived {
            records,
            symbols,
            archive_bytes,
        } => {
            assert_eq!(records, 3);
            assert_eq!(symbols, 1);
            assert!(archive_bytes > 0);
        }
        PartitionOutcome::Skipped => panic!("archive_partition never skips"),
    }

    let index = LocalDirStore::new(remote.path())
        .partition_index()
        .await
        .unwrap();
    let meta = index.get("binance_kline_daily_5m-20230228.tar").unwrap();
    assert_eq!(meta.partition_key.as_deref(), Some("202302"));
}
