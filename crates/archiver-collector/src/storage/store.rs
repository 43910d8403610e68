//! 원격 아카이브 저장소 trait.

use async_trait::async_trait;
use std::path::Path;

use archiver_core::PartitionIndex;

use crate::Result;

/// 파티션 아카이브를 보관하는 원격 저장소.
///
/// 아카이브는 `partition_key` 버킷 아래에 파일명 그대로 저장됩니다.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// 저장소 이름 (로그용).
    fn name(&self) -> &str;

    /// 이미 저장된 아카이브 목록의 스냅샷.
    async fn partition_index(&self) -> Result<PartitionIndex>;

    /// 로컬 파일을 업로드합니다.
    ///
    /// 같은 이름이 이미 있고 `overwrite`가 거짓이면 `Ok(false)`를 반환합니다.
    async fn upload(&self, local_path: &Path, partition_key: &str, overwrite: bool)
        -> Result<bool>;
}

/// 업로드 대상 파일명.
pub(crate) fn upload_filename(local_path: &Path) -> Result<String> {
    local_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            crate::CollectorError::Upload(format!(
                "파일명을 알 수 없음: {}",
                local_path.display()
            ))
        })
}
