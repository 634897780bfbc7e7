//! # BaaS クライアントハンドル
//!
//! ベース URL・API キー・トランスポートを束ねる。起動時に1つ作成し、
//! `Arc` で共有する。生成後は不変。

use std::{fmt, sync::Arc};

use http::{HeaderName, Method, header};

use crate::{
    error::InfraError,
    query::Table,
    storage::StorageClient,
    transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport},
};

const APIKEY_HEADER: HeaderName = HeaderName::from_static("apikey");

/// BaaS クライアント
///
/// テーブル操作は [`from`](BaasClient::from)、ストレージ操作は
/// [`storage`](BaasClient::storage) から始める。
#[derive(Clone)]
pub struct BaasClient {
    transport: Arc<dyn HttpTransport>,
    base_url:  String,
    api_key:   String,
}

impl BaasClient {
    /// reqwest トランスポートでクライアントを作成する
    ///
    /// # 引数
    ///
    /// - `base_url`: BaaS のベース URL（例: `https://xyz.supabase.co`）。末尾の `/` は除去する
    /// - `api_key`: `apikey` ヘッダーと Bearer トークンに使うキー
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self::with_transport(base_url, api_key, Arc::new(ReqwestTransport::new()))
    }

    /// 任意のトランスポートでクライアントを作成する
    pub fn with_transport(
        base_url: &str,
        api_key: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// テーブル（またはビュー）に対する操作を開始する
    pub fn from(&self, table: impl Into<String>) -> Table {
        Table::new(self.clone(), table.into())
    }

    pub fn storage(&self) -> StorageClient {
        StorageClient::new(self.clone())
    }

    /// 認証ヘッダー付きのリクエストを作成する
    pub(crate) fn request(&self, method: Method, url: String) -> Result<HttpRequest, InfraError> {
        HttpRequest::new(method, url)
            .header(APIKEY_HEADER, &self.api_key)?
            .header(header::AUTHORIZATION, &format!("Bearer {}", self.api_key))
    }

    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse, InfraError> {
        self.transport.send(request).await
    }
}

impl fmt::Debug for BaasClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaasClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .finish_non_exhaustive()
    }
}
