//! # キャッシュ制御ミドルウェア
//!
//! 記録データは利用者ごとに変わるため、API レスポンスに
//! `Cache-Control: no-store` を付ける。ハンドラが明示的に設定した値は上書きしない。

use axum::{
   extract::Request,
   http::{HeaderValue, header},
   middleware::Next,
   response::Response,
};

pub async fn no_cache(request: Request, next: Next) -> Response {
   let mut response = next.run(request).await;
   response
      .headers_mut()
      .entry(header::CACHE_CONTROL)
      .or_insert(HeaderValue::from_static("no-store"));
   response
}
