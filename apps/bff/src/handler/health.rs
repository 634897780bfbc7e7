//! # ヘルスチェックハンドラ
//!
//! BFF の稼働状態を確認するためのエンドポイント。
//!
//! - `/health` - Liveness Check（常に `"healthy"` を返す）
//! - `/health/ready` - Readiness Check（BaaS への到達性と画像バケットの存在を確認）
//!
//! レスポンス型は [`checkin_shared::HealthResponse`] / [`checkin_shared::ReadinessResponse`] を参照。

use std::{sync::Arc, time::Duration};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use checkin_infra::BaasClient;
use checkin_shared::{HealthResponse, ReadinessResponse, StorageChecks};

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// BFF のヘルスチェックエンドポイント
#[utoipa::path(
   get,
   path = "/health",
   tag = "health",
   responses(
      (status = 200, description = "サーバー稼働中", body = HealthResponse)
   )
)]
pub async fn health_check() -> Json<HealthResponse> {
   Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}

/// Readiness Check 用の State
pub struct ReadinessState {
   pub baas:   BaasClient,
   pub bucket: String,
}

/// BFF の Readiness Check エンドポイント
///
/// バケット一覧を 1 回取得し、BaaS への到達性と画像バケットの存在を判定する。
/// 全チェック OK → 200、1 つでも失敗 → 503。
#[utoipa::path(
   get,
   path = "/health/ready",
   tag = "health",
   responses(
      (status = 200, description = "全依存サービス稼働中", body = ReadinessResponse),
      (status = 503, description = "一部の依存サービスが利用不可", body = ReadinessResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn readiness_check(State(state): State<Arc<ReadinessState>>) -> impl IntoResponse {
   let response = ReadinessResponse::from_checks(check_storage(&state.baas, &state.bucket).await);
   let http_status = if response.is_ready() {
      StatusCode::OK
   } else {
      StatusCode::SERVICE_UNAVAILABLE
   };

   (http_status, Json(response))
}

/// バケット一覧を取得する（タイムアウト: 5 秒）
async fn check_storage(baas: &BaasClient, bucket: &str) -> StorageChecks {
   match tokio::time::timeout(CHECK_TIMEOUT, baas.storage().list_buckets()).await {
      Ok(Ok(buckets)) => {
         let found = buckets.iter().any(|b| b == bucket);
         if !found {
            tracing::warn!(bucket, "readiness check: storage bucket not found");
         }
         StorageChecks::reachable(found)
      }
      Ok(Err(e)) => {
         tracing::warn!(error = %e, "readiness check: baas request failed");
         StorageChecks::unreachable()
      }
      Err(_) => {
         tracing::warn!("readiness check: baas check timed out");
         StorageChecks::unreachable()
      }
   }
}

#[cfg(test)]
mod tests {
   use axum::http::StatusCode;
   use checkin_infra::mock::InMemoryBaas;
   use pretty_assertions::assert_eq;
   use serde_json::json;

   use super::super::test_utils::*;

   #[tokio::test]
   async fn test_health_check_バージョンを返す() {
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);

      let (status, body) = send(sut, get("/health")).await;

      assert_eq!(status, StatusCode::OK);
      assert_eq!(
         body,
         json!({"status": "healthy", "version": env!("CARGO_PKG_VERSION")})
      );
      assert_eq!(baas.request_count(), 0);
   }

   #[tokio::test]
   async fn test_readiness_check_バケットが存在すれば200() {
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);

      let (status, body) = send(sut, get("/health/ready")).await;

      assert_eq!(status, StatusCode::OK);
      assert_eq!(body["status"], "ready");
      assert_eq!(body["checks"]["baas"], "ok");
      assert_eq!(body["checks"]["storage_bucket"], "ok");
   }

   #[tokio::test]
   async fn test_readiness_check_バケットがなければ503() {
      let baas = InMemoryBaas::with_buckets(&["avatars"]);
      let sut = create_test_app(&baas);

      let (status, body) = send(sut, get("/health/ready")).await;

      assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
      assert_eq!(body["status"], "not_ready");
      assert_eq!(body["checks"]["baas"], "ok");
      assert_eq!(body["checks"]["storage_bucket"], "error");
   }

   #[tokio::test]
   async fn test_readiness_check_baasエラーなら503() {
      let baas = InMemoryBaas::new();
      baas.fail_with(StatusCode::BAD_GATEWAY, "bad gateway");
      let sut = create_test_app(&baas);

      let (status, body) = send(sut, get("/health/ready")).await;

      assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
      assert_eq!(body["checks"]["baas"], "error");
   }
}
