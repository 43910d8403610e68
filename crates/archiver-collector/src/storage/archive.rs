//! tar + xz 아카이브.
//!
//! 파티션 아카이브는 CSV 하나만 담은 tar 스트림을 xz(LZMA2)로 압축한 파일입니다.
//! 엔트리 이름은 CSV 파일명 그대로입니다.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::error::CollectorError;
use crate::Result;

/// `source`를 단일 엔트리 tar.xz로 `dest`에 압축합니다. 압축 결과 크기를 반환합니다.
pub fn compress_file(source: &Path, dest: &Path, level: u32) -> Result<u64> {
    let entry_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CollectorError::Archive(format!("엔트리 이름을 만들 수 없음: {}", source.display()))
        })?;

    let file = File::create(dest)?;
    let encoder = XzEncoder::new(BufWriter::new(file), level);
    let mut builder = tar::Builder::new(encoder);

    builder
        .append_path_with_name(source, entry_name)
        .map_err(|e| CollectorError::Archive(format!("{}: {}", source.display(), e)))?;

    let encoder = builder.into_inner()?;
    let mut writer = encoder.finish()?;
    writer.flush()?;

    let size = std::fs::metadata(dest)?.len();
    debug!(
        source = %source.display(),
        dest = %dest.display(),
        size,
        "압축 완료"
    );
    Ok(size)
}

/// 블로킹 풀에서 압축합니다.
pub async fn compress_blocking(source: PathBuf, dest: PathBuf, level: u32) -> Result<u64> {
    tokio::task::spawn_blocking(move || compress_file(&source, &dest, level))
        .await
        .map_err(|e| CollectorError::Archive(format!("압축 작업 실패: {}", e)))?
}

/// 단일 엔트리 아카이브를 풀어 (엔트리 이름, 내용)을 반환합니다.
pub fn read_single_entry(archive: &Path) -> Result<(String, Vec<u8>)> {
    let decoder = XzDecoder::new(BufReader::new(File::open(archive)?));
    let mut tar = tar::Archive::new(decoder);

    let mut entries = tar.entries()?;
    let mut entry = entries
        .next()
        .ok_or_else(|| CollectorError::Archive(format!("빈 아카이브: {}", archive.display())))??;

    let name = entry.path()?.to_string_lossy().into_owned();
    let mut content = Vec::new();
    entry.read_to_end(&mut content)?;

    Ok((name, content))
}
