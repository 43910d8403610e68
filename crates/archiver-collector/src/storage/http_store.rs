//! HTTP 파일 서버 저장소.
//!
//! - `GET {base}/partitions` → `[ArchiveMeta]` JSON
//! - `PUT {base}/partitions/{key}/{filename}?overwrite={bool}` ← 아카이브 바이트
//!
//! `409 Conflict`는 "이미 존재하여 저장하지 않음"을 뜻합니다.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use archiver_core::{ArchiveMeta, PartitionIndex};

use super::store::{upload_filename, RemoteStore};
use crate::error::CollectorError;
use crate::Result;

/// HTTP 원격 저장소.
pub struct HttpStore {
    base_url: String,
    token: Option<SecretString>,
    client: Client,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, token: Option<SecretString>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| CollectorError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn partition_index(&self) -> Result<PartitionIndex> {
        let url = format!("{}/partitions", self.base_url);
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::Upload(format!(
                "인덱스 조회 실패 HTTP {}: {}",
                status, body
            )));
        }

        let entries: Vec<ArchiveMeta> = response.json().await?;
        Ok(entries.into_iter().collect())
    }

    async fn upload(
        &self,
        local_path: &Path,
        partition_key: &str,
        overwrite: bool,
    ) -> Result<bool> {
        let filename = upload_filename(local_path)?;
        let body = tokio::fs::read(local_path).await?;
        let url = format!(
            "{}/partitions/{}/{}?overwrite={}",
            self.base_url, partition_key, filename, overwrite
        );
        debug!(bytes = body.len(), "PUT {}", url);

        let response = self
            .authorize(self.client.put(&url))
            .header("content-type", "application/x-xz")
            .body(body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::CONFLICT => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(CollectorError::Upload(format!("HTTP {}: {}", status, body)))
            }
        }
    }
}
