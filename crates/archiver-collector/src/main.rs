//! Partitioned market data archiver CLI.

use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use archiver_collector::config::StoreConfig;
use archiver_collector::modules::PartitionOrchestrator;
use archiver_collector::storage::{HttpStore, LocalDirStore, RemoteStore};
use archiver_collector::CollectorConfig;
use archiver_core::{init_logging, DataType, Frequency, LogConfig, LogFormat, Timeframe};
use archiver_exchange::{BinanceClient, MarketDataSource};

#[derive(Parser)]
#[command(name = "archiver-collector")]
#[command(about = "Partitioned market data archiver", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error). 없으면 `ARCHIVER_LOG`
    #[arg(long)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact). 없으면 `LOG_FORMAT`
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// 어제부터 거꾸로 N개 파티션을 아카이브
    Download {
        /// 파티션 수
        #[arg(long, default_value_t = 365)]
        days: usize,

        /// 데이터 종류 (kline, trade)
        #[arg(long, default_value = "kline")]
        data_type: DataType,

        /// 캔들 타임프레임 (설정값 대신 사용)
        #[arg(long)]
        timeframe: Option<Timeframe>,

        /// 파티션 주기 (daily, weekly)
        #[arg(long)]
        frequency: Option<Frequency>,
    },

    /// 파티션 하나를 로컬 CSV로만 수집
    Export {
        /// 날짜 (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// 데이터 종류 (kline, trade)
        #[arg(long, default_value = "kline")]
        data_type: DataType,

        /// 특정 심볼만 수집 (쉼표로 구분, 예: "BTC/USDT,ETH/USDT")
        #[arg(long)]
        symbols: Option<String>,

        /// 캔들 타임프레임
        #[arg(long)]
        timeframe: Option<Timeframe>,
    },

    /// 원격 파티션 인덱스 출력
    Index,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let mut log_config = LogConfig::from_env();
    if let Some(level) = &cli.log_level {
        log_config.level = format!(
            "archiver_collector={0},archiver_exchange={0},archiver_core={0}",
            level
        );
    }
    if let Some(format) = cli.log_format {
        log_config = log_config.with_format(format);
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("Market Archiver 시작");

    let CollectorConfig {
        store,
        mut orchestrator,
        kline,
        trade,
        binance,
    } = CollectorConfig::from_env().context("설정 로드 실패")?;
    tracing::debug!(
        store = ?store,
        work_dir = %orchestrator.work_dir.display(),
        "설정 로드 완료"
    );

    let store: Arc<dyn RemoteStore> = match store {
        StoreConfig::Local { root } => Arc::new(LocalDirStore::new(root)),
        StoreConfig::Http { base_url, token } => Arc::new(HttpStore::new(base_url, token)?),
    };
    let source: Arc<dyn MarketDataSource> =
        Arc::new(BinanceClient::new(binance).context("Binance 클라이언트 생성 실패")?);

    match cli.command {
        Commands::Download {
            days,
            data_type,
            timeframe,
            frequency,
        } => {
            if let Some(timeframe) = timeframe {
                orchestrator.timeframe = timeframe;
            }
            if let Some(frequency) = frequency {
                orchestrator.frequency = frequency;
            }

            let orchestrator =
                PartitionOrchestrator::new(source, store, orchestrator, kline, trade);
            let today = Utc::now().date_naive();
            orchestrator
                .run(data_type, days, today)
                .await
                .context("아카이브 실패")?;
        }
        Commands::Export {
            date,
            data_type,
            symbols,
            timeframe,
        } => {
            if let Some(timeframe) = timeframe {
                orchestrator.timeframe = timeframe;
            }
            orchestrator.frequency = Frequency::Daily;

            let orchestrator =
                PartitionOrchestrator::new(source, store, orchestrator, kline, trade);
            let partition = orchestrator.partition_for(data_type, date);
            let symbols: Option<Vec<String>> = symbols.map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });

            let (path, report) = orchestrator
                .export_partition(&partition, symbols.as_deref())
                .await
                .with_context(|| format!("{} 내보내기 실패", partition))?;

            println!("{} ({} records)", path.display(), report.records);
        }
        Commands::Index => {
            let index = store.partition_index().await.context("인덱스 조회 실패")?;
            for meta in index.sorted() {
                println!(
                    "{}\t{}\t{}",
                    meta.partition_key.as_deref().unwrap_or("-"),
                    meta.name,
                    meta.size
                );
            }
            tracing::info!(entries = index.len(), store = store.name(), "인덱스 출력 완료");
        }
    }

    tracing::info!("Market Archiver 종료");
    Ok(())
}
