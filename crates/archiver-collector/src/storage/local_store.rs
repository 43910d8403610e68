//! 마운트된 디렉토리 저장소.
//!
//! 배치: `{root}/{partition_key}/{filename}`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use archiver_core::{ArchiveMeta, PartitionIndex};

use super::store::{upload_filename, RemoteStore};
use crate::Result;

/// 로컬(또는 네트워크 마운트) 디렉토리를 원격 저장소로 사용합니다.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn scan_bucket(&self, key: &str, index: &mut PartitionIndex) -> Result<()> {
        let mut files = tokio::fs::read_dir(self.root.join(key)).await?;
        while let Some(file) = files.next_entry().await? {
            let metadata = file.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let name = file.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".tar") {
                continue;
            }
            index.insert(ArchiveMeta {
                name,
                partition_key: Some(key.to_string()),
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for LocalDirStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn partition_index(&self) -> Result<PartitionIndex> {
        let mut index = PartitionIndex::new();

        if !tokio::fs::try_exists(&self.root).await? {
            debug!(root = %self.root.display(), "저장소 디렉토리 없음, 빈 인덱스");
            return Ok(index);
        }

        let mut buckets = tokio::fs::read_dir(&self.root).await?;
        while let Some(bucket) = buckets.next_entry().await? {
            if !bucket.file_type().await?.is_dir() {
                continue;
            }
            let key = bucket.file_name().to_string_lossy().into_owned();
            self.scan_bucket(&key, &mut index).await?;
        }

        debug!(root = %self.root.display(), entries = index.len(), "인덱스 스캔 완료");
        Ok(index)
    }

    async fn upload(
        &self,
        local_path: &Path,
        partition_key: &str,
        overwrite: bool,
    ) -> Result<bool> {
        let filename = upload_filename(local_path)?;
        let bucket = self.root.join(partition_key);
        let dest = bucket.join(&filename);

        if !overwrite && tokio::fs::try_exists(&dest).await? {
            info!(dest = %dest.display(), "이미 존재하여 업로드하지 않음");
            return Ok(false);
        }

        tokio::fs::create_dir_all(&bucket).await?;

        // 완성된 파일만 최종 이름으로 보인다
        let partial = bucket.join(format!(".{}.part", filename));
        tokio::fs::copy(local_path, &partial).await?;
        tokio::fs::rename(&partial, &dest).await?;

        debug!(dest = %dest.display(), "업로드 완료");
        Ok(true)
    }
}
