//! # HTTP トランスポート
//!
//! BaaS への HTTP 送受信を抽象化する。
//!
//! クエリビルダーとストレージクライアントは [`HttpRequest`] を組み立てて
//! [`HttpTransport::send`] に渡すだけで、実際の送信手段を知らない。
//! 本番では [`ReqwestTransport`]、テストでは `mock::InMemoryBaas` を使う。

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::error::InfraError;

/// 送信する HTTP リクエスト
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method:  Method,
    /// クエリ文字列を含む絶対 URL
    pub url:     String,
    pub headers: HeaderMap,
    pub body:    Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// ヘッダーを追加する
    ///
    /// 値にヘッダーとして不正な文字（改行など）が含まれる場合は
    /// `InvalidQuery` エラーを返す。
    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, InfraError> {
        let value = HeaderValue::from_str(value).map_err(|_| {
            InfraError::invalid_query(format!("ヘッダー {name} の値が不正です"))
        })?;
        self.headers.append(name, value);
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// ヘッダー値を文字列として取得する（テスト・モック用）
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// 受信した HTTP レスポンス
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status:  StatusCode,
    pub headers: HeaderMap,
    pub body:    Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// ボディを UTF-8 として解釈する（不正なバイト列は置換文字になる）
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP 送受信のインターフェース
///
/// 非 2xx レスポンスはエラーではなく `Ok(HttpResponse)` として返す。
/// エラーになるのは通信自体が失敗した場合のみ。
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, InfraError>;
}

/// 送信直前に reqwest のリクエストビルダーへ手を加えるフック
///
/// BFF はこれを使って受信リクエストの `X-Request-Id` を付与する。
pub type RequestDecorator = fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder;

/// reqwest による [`HttpTransport`] 実装
///
/// `reqwest::Client` は内部にコネクションプールを持つため、
/// アプリケーション全体で1つを共有する。
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client:    reqwest::Client,
    decorator: Option<RequestDecorator>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            decorator: None,
        }
    }

    /// 送信前フックを設定する
    pub fn with_decorator(mut self, decorator: RequestDecorator) -> Self {
        self.decorator = Some(decorator);
        self
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, InfraError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(decorate) = self.decorator {
            builder = decorate(builder);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_headerは同名ヘッダーを追記する() {
        let request = HttpRequest::new(Method::GET, "http://localhost/rest/v1/tasks")
            .header(http::header::ACCEPT, "application/json")
            .unwrap()
            .header(HeaderName::from_static("apikey"), "key")
            .unwrap();

        assert_eq!(request.header_str("apikey"), Some("key"));
        assert_eq!(request.header_str("accept"), Some("application/json"));
    }

    #[test]
    fn test_header_改行を含む値はinvalid_queryになる() {
        let result = HttpRequest::new(Method::GET, "http://localhost")
            .header(HeaderName::from_static("apikey"), "bad\nkey");

        assert!(matches!(
            result.unwrap_err().kind(),
            crate::InfraErrorKind::InvalidQuery(_)
        ));
    }

    #[test]
    fn test_response_textは不正なutf8を置換する() {
        let response = HttpResponse::new(StatusCode::BAD_REQUEST, vec![b'o', b'k', 0xff]);

        assert_eq!(response.text(), "ok\u{fffd}");
    }

    #[tokio::test]
    async fn test_接続できないホストへの送信はtransportエラーになる() {
        let transport = ReqwestTransport::new();
        let request = HttpRequest::new(Method::GET, "http://127.0.0.1:1/rest/v1/users");

        let err = transport.send(request).await.unwrap_err();

        assert_eq!(err.kind_name(), "transport");
    }
}
