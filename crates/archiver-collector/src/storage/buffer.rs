//! 윈도우 필터링 버퍼 writer.
//!
//! 페이지마다 싱크를 호출하지 않도록 레코드를 메모리에 모았다가
//! 임계값에 도달하거나 종료할 때 한 번에 내보냅니다.
//! 내보내기 직전에 윈도우 `[start, end)` 밖의 레코드를 걸러냅니다.

use archiver_core::{ArchiveRecord, TimeWindow};
use tracing::{debug, warn};

use crate::error::CollectorError;
use crate::storage::RecordSink;
use crate::Result;

/// 임계값 기반 버퍼 writer.
pub struct BufferedWriter<R: ArchiveRecord> {
    window: TimeWindow,
    flush_threshold: usize,
    buffer: Vec<R>,
    sink: Box<dyn RecordSink<R>>,
    closed: bool,
    flushed_batches: usize,
    flushed_records: usize,
    dropped_records: usize,
}

impl<R: ArchiveRecord> BufferedWriter<R> {
    pub fn new(window: TimeWindow, flush_threshold: usize, sink: Box<dyn RecordSink<R>>) -> Self {
        Self {
            window,
            flush_threshold,
            buffer: Vec::new(),
            sink,
            closed: false,
            flushed_batches: 0,
            flushed_records: 0,
            dropped_records: 0,
        }
    }

    /// 레코드를 추가합니다.
    ///
    /// `allow_buffering`이 참이고 버퍼가 임계값 미만이면 그대로 둡니다.
    /// 그 외에는 윈도우로 필터링한 뒤 싱크로 내보냅니다.
    pub fn write<I>(&mut self, records: I, allow_buffering: bool) -> Result<()>
    where
        I: IntoIterator<Item = R>,
    {
        if self.closed {
            return Err(CollectorError::Sink("닫힌 writer에 기록 시도".to_string()));
        }

        self.buffer.extend(records);
        if allow_buffering && self.buffer.len() < self.flush_threshold {
            return Ok(());
        }

        let buffered = self.buffer.len();
        let window = self.window;
        let batch: Vec<R> = self
            .buffer
            .drain(..)
            .filter(|r| window.contains(r.timestamp()))
            .collect();
        let dropped = buffered - batch.len();
        self.dropped_records += dropped;

        if batch.is_empty() {
            return Ok(());
        }

        self.sink.append(&batch)?;
        self.flushed_batches += 1;
        self.flushed_records += batch.len();

        debug!(
            records = batch.len(),
            dropped,
            window = %self.window,
            "버퍼 flush"
        );
        Ok(())
    }

    /// 버퍼에 남은 레코드를 모두 내보냅니다.
    pub fn flush(&mut self) -> Result<()> {
        self.write(std::iter::empty(), false)
    }

    /// 마지막 flush 후 싱크를 닫습니다.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.flush()?;
        self.closed = true;
        self.sink.close()
    }

    /// 아직 내보내지 않은 레코드 수.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn flushed_batches(&self) -> usize {
        self.flushed_batches
    }

    pub fn flushed_records(&self) -> usize {
        self.flushed_records
    }

    /// 윈도우 밖이라 버려진 레코드 수.
    pub fn dropped_records(&self) -> usize {
        self.dropped_records
    }
}

impl<R: ArchiveRecord> Drop for BufferedWriter<R> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.close() {
            warn!(
                error = %e,
                pending = self.buffer.len(),
                "writer 정리 중 flush 실패"
            );
        }
    }
}
