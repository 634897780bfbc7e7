//! # ストレージバケットクライアント
//!
//! BaaS のオブジェクトストレージ（`/storage/v1`）を操作する。
//!
//! - アップロード: `PUT {base}/storage/v1/object/{bucket}/{path}`
//! - 公開 URL: `{base}/storage/v1/object/public/{bucket}/{path}`（存在確認はしない）
//!
//! URL に埋め込むバケット名とパスは `/` 区切りのセグメントごとにパーセントエンコードする。
//! - バケット一覧: `GET {base}/storage/v1/bucket`（readiness チェック用）

use bytes::Bytes;
use http::{Method, header};
use serde::Deserialize;

use crate::{client::BaasClient, error::InfraError};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// ストレージ操作の起点
#[derive(Debug, Clone)]
pub struct StorageClient {
    client: BaasClient,
}

impl StorageClient {
    pub(crate) fn new(client: BaasClient) -> Self {
        Self { client }
    }

    pub fn from(&self, bucket: impl Into<String>) -> StorageBucket {
        StorageBucket {
            client: self.client.clone(),
            bucket: bucket.into(),
        }
    }

    /// バケット名の一覧を取得する
    #[tracing::instrument(skip_all, level = "debug")]
    pub async fn list_buckets(&self) -> Result<Vec<String>, InfraError> {
        #[derive(Deserialize)]
        struct Bucket {
            name: String,
        }

        let url = format!("{}/storage/v1/bucket", self.client.base_url());
        let request = self.client.request(Method::GET, url)?;
        let response = self.client.send(request).await?;
        if !response.status.is_success() {
            return Err(InfraError::store(response.status.as_u16(), response.text()));
        }

        let buckets: Vec<Bucket> = serde_json::from_slice(&response.body)?;
        Ok(buckets.into_iter().map(|b| b.name).collect())
    }
}

/// アップロード済みオブジェクト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    /// バケット内のパス
    pub path: String,
}

/// 1つのバケットに対する操作
#[derive(Debug, Clone)]
pub struct StorageBucket {
    client: BaasClient,
    bucket: String,
}

impl StorageBucket {
    pub fn name(&self) -> &str {
        &self.bucket
    }

    /// オブジェクトをアップロードする
    ///
    /// `content_type` 未指定時は `application/octet-stream` を送る。
    #[tracing::instrument(skip_all, level = "debug", fields(bucket = %self.bucket, path = %path))]
    pub async fn upload(
        &self,
        path: &str,
        content: Bytes,
        content_type: Option<&str>,
    ) -> Result<UploadedObject, InfraError> {
        if self.bucket.trim().is_empty() {
            return Err(InfraError::invalid_query("バケット名が空です"));
        }
        if path.trim().is_empty() {
            return Err(InfraError::invalid_query("オブジェクトパスが空です"));
        }

        let url = format!(
            "{}/storage/v1/object/{}",
            self.client.base_url(),
            self.object_key(path)
        );
        let request = self
            .client
            .request(Method::PUT, url)?
            .header(
                header::CONTENT_TYPE,
                content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
            )?
            .body(content);

        let response = self.client.send(request).await?;
        if !response.status.is_success() {
            return Err(InfraError::store(response.status.as_u16(), response.text()));
        }

        tracing::debug!(size = response.body.len(), "オブジェクトをアップロードしました");
        Ok(UploadedObject {
            path: path.to_string(),
        })
    }

    /// 公開 URL を組み立てる（文字列連結のみ）
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}",
            self.client.base_url(),
            self.object_key(path)
        )
    }

    /// `{bucket}/{path}` を URL 用にエンコードする（`/` はそのまま残す）
    fn object_key(&self, path: &str) -> String {
        std::iter::once(self.bucket.as_str())
            .chain(path.split('/'))
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/")
    }
}
