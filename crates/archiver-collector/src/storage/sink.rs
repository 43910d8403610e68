//! 레코드 싱크.
//!
//! 싱크는 검증된 행을 받아 영속 저장소에 추가합니다.
//! 파티션 한 주기 동안 하나의 싱크가 하나의 파일을 소유합니다.

use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use archiver_core::ArchiveRecord;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::debug;

use crate::error::CollectorError;
use crate::Result;

/// 행 단위 추가 전용 싱크.
pub trait RecordSink<R: ArchiveRecord>: Send {
    /// 행 묶음을 추가합니다.
    fn append(&mut self, rows: &[R]) -> Result<()>;

    /// 남은 출력을 내보내고 닫습니다. 여러 번 호출해도 됩니다.
    fn close(&mut self) -> Result<()>;
}

/// 파일 I/O를 실행합니다.
///
/// 멀티 스레드 런타임 안에서는 `block_in_place`로 워커를 비워 두고,
/// 단일 스레드 런타임이나 런타임 밖에서는 그대로 호출합니다.
pub(crate) fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// 고정 헤더를 가진 CSV 파일 싱크.
///
/// 생성 시 헤더를 쓰고, `append`마다 파일까지 flush합니다.
pub struct CsvSink<R> {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    rows_written: usize,
    _record: PhantomData<fn(R)>,
}

impl<R: ArchiveRecord> CsvSink<R> {
    /// 파일을 새로 만들고 헤더를 기록합니다 (기존 파일은 덮어씀).
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = run_blocking(|| -> Result<csv::Writer<File>> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&path)?;
            writer.write_record(R::HEADERS)?;
            writer.flush()?;
            Ok(writer)
        })?;

        debug!(path = %path.display(), "CSV 싱크 생성");

        Ok(Self {
            path,
            writer: Some(writer),
            rows_written: 0,
            _record: PhantomData,
        })
    }

    /// 헤더를 제외한 기록 행 수.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

impl<R: ArchiveRecord> RecordSink<R> for CsvSink<R> {
    fn append(&mut self, rows: &[R]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            CollectorError::Sink(format!("닫힌 싱크에 기록 시도: {}", self.path.display()))
        })?;

        run_blocking(|| -> Result<()> {
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
            Ok(())
        })?;
        self.rows_written += rows.len();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            run_blocking(|| writer.flush())?;
            debug!(
                path = %self.path.display(),
                rows = self.rows_written,
                "CSV 싱크 닫힘"
            );
        }
        Ok(())
    }
}

/// 메모리 싱크 (드라이런, 테스트).
///
/// 핸들을 복제해 두면 싱크를 넘겨준 뒤에도 기록된 배치를 볼 수 있습니다.
#[derive(Clone)]
pub struct MemorySink<R> {
    batches: Arc<Mutex<Vec<Vec<R>>>>,
}

impl<R: ArchiveRecord> MemorySink<R> {
    pub fn new() -> Self {
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 지금까지 받은 배치들.
    pub fn batches(&self) -> Vec<Vec<R>> {
        self.batches
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }

    /// 모든 배치를 이어 붙인 행.
    pub fn rows(&self) -> Vec<R> {
        self.batches().into_iter().flatten().collect()
    }
}

impl<R: ArchiveRecord> Default for MemorySink<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ArchiveRecord> RecordSink<R> for MemorySink<R> {
    fn append(&mut self, rows: &[R]) -> Result<()> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|_| CollectorError::Sink("메모리 싱크 잠금 실패".to_string()))?;
        batches.push(rows.to_vec());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
