//! ハンドラテスト用のヘルパー
//!
//! [`InMemoryBaas`] に接続したルーター全体を組み立て、`oneshot` で叩く。

use std::sync::Arc;

use axum::{
   Router,
   body::Body,
   http::{Method, Request, StatusCode, header},
};
use checkin_infra::mock::InMemoryBaas;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use crate::{
   app_builder::build_app,
   client::NoopGeocoder,
   clock::FixedClock,
   config::{BffConfig, DEFAULT_UPLOAD_MAX_BYTES, GeocodingProvider},
};

/// [`FixedClock`] が返す時刻の保存形式
pub const TEST_NOW: &str = "2024-05-01T07:30:00.000000Z";

pub fn test_config() -> BffConfig {
   BffConfig {
      host:             "127.0.0.1".to_string(),
      port:             0,
      supabase_url:     checkin_infra::mock::MOCK_BASE_URL.to_string(),
      supabase_key:     checkin_infra::mock::MOCK_API_KEY.to_string(),
      storage_bucket:   "images".to_string(),
      upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
      geocoding:        GeocodingProvider::Disabled,
   }
}

pub fn create_test_app(baas: &InMemoryBaas) -> Router {
   let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 7, 30, 0).unwrap());
   build_app(
      &test_config(),
      baas.client(),
      Arc::new(NoopGeocoder),
      Arc::new(clock),
   )
}

pub fn get(uri: &str) -> Request<Body> {
   Request::builder()
      .method(Method::GET)
      .uri(uri)
      .body(Body::empty())
      .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
   Request::builder()
      .method(Method::DELETE)
      .uri(uri)
      .body(Body::empty())
      .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
   Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
}

/// リクエストを送り、ステータスと JSON ボディを返す
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
   let response = app.oneshot(request).await.unwrap();
   let status = response.status();
   let body = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
   let json = if body.is_empty() {
      Value::Null
   } else {
      serde_json::from_slice(&body).unwrap()
   };
   (status, json)
}
