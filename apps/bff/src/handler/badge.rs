//! # バッジ API ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/badges?user_id=` - 解除済みバッジ一覧（バッジ定義を埋め込み）
//! - `GET /api/badges/{id}` - バッジ定義
//! - `POST /api/badges/unlock` - バッジ解除

use std::sync::Arc;

use axum::{
   Json,
   extract::{
      Path,
      Query,
      State,
      rejection::{JsonRejection, QueryRejection},
   },
   http::StatusCode,
   response::{IntoResponse, Response},
};
use checkin_infra::{query::Direction, tables};
use checkin_shared::ErrorResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::{
   RecordResponse,
   RecordState,
   UserIdQuery,
   created_data,
   filter_value,
   ok_data,
   require,
   require_value,
   single_row,
};
use crate::error::{ApiError, log_and_convert_store_error};

/// 解除済みバッジ一覧で取得する列
const USER_BADGE_COLUMNS: &str = "id, badge_id, unlocked_at, badges(*)";

/// バッジ解除リクエスト
///
/// ID はテーブルの主キー型に合わせて文字列・数値のどちらも受け付ける。
#[derive(Debug, Deserialize, ToSchema)]
pub struct UnlockBadgeRequest {
   #[schema(value_type = Option<String>)]
   pub user_id:  Option<Value>,
   #[schema(value_type = Option<String>)]
   pub badge_id: Option<Value>,
}

/// 解除済みバッジ一覧のレスポンス
#[derive(Debug, Serialize, ToSchema)]
pub struct BadgeListResponse {
   #[schema(value_type = Vec<Object>)]
   pub data:  Vec<Value>,
   pub total: usize,
}

/// GET /api/badges
#[utoipa::path(
   get,
   path = "/api/badges",
   tag = "badges",
   params(UserIdQuery),
   responses(
      (status = 200, description = "解除済みバッジ一覧", body = BadgeListResponse),
      (status = 400, description = "user_id が未指定", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn list_badges(
   State(state): State<Arc<RecordState>>,
   query: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
   let Query(query) = query?;
   let user_id = require("user_id", query.user_id)?;

   let response = state
      .baas
      .from(tables::USER_BADGES)
      .select(USER_BADGE_COLUMNS)
      .eq("user_id", user_id)
      .order("unlocked_at", Direction::Desc)
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("バッジ一覧取得", e))?;

   let total = response.data.len();
   let body = BadgeListResponse {
      data: response.data,
      total,
   };
   Ok((StatusCode::OK, Json(body)).into_response())
}

/// GET /api/badges/{id}
#[utoipa::path(
   get,
   path = "/api/badges/{id}",
   tag = "badges",
   params(("id" = String, Path, description = "バッジ ID")),
   responses(
      (status = 200, description = "バッジ定義", body = RecordResponse),
      (status = 404, description = "バッジが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_badge(
   State(state): State<Arc<RecordState>>,
   Path(id): Path<String>,
) -> Result<Response, ApiError> {
   let response = state
      .baas
      .from(tables::BADGES)
      .select("*")
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("バッジ取得", e))?;

   Ok(ok_data(single_row(response, "badge", &id)?))
}

/// POST /api/badges/unlock
///
/// 解除済みかを確認してから解除記録を作成する。解除済みなら 400。
#[utoipa::path(
   post,
   path = "/api/badges/unlock",
   tag = "badges",
   request_body = UnlockBadgeRequest,
   responses(
      (status = 201, description = "解除記録", body = RecordResponse),
      (status = 400, description = "必須項目の欠落、または解除済み", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn unlock_badge(
   State(state): State<Arc<RecordState>>,
   payload: Result<Json<UnlockBadgeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
   let Json(req) = payload?;
   let user_id = require_value("user_id", req.user_id)?;
   let badge_id = require_value("badge_id", req.badge_id)?;

   let existing = state
      .baas
      .from(tables::USER_BADGES)
      .select("id")
      .eq("user_id", filter_value(&user_id))
      .eq("badge_id", filter_value(&badge_id))
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("バッジ解除状況の確認", e))?;
   if !existing.is_empty() {
      return Err(ApiError::validation("このバッジは解除済みです"));
   }

   let record = json!({
      "user_id": user_id,
      "badge_id": badge_id,
      "unlocked_at": state.clock.timestamp(),
   });
   let unlocked = state
      .baas
      .from(tables::USER_BADGES)
      .insert(record)
      .execute_single()
      .await
      .map_err(|e| log_and_convert_store_error("バッジ解除", e))?;

   tracing::info!(%user_id, %badge_id, "バッジを解除しました");
   Ok(created_data(unlocked))
}

#[cfg(test)]
mod tests {
   use axum::http::Method;
   use checkin_infra::mock::InMemoryBaas;
   use pretty_assertions::assert_eq;
   use serde_json::json;

   use super::{super::test_utils::*, *};

   #[tokio::test]
   async fn test_list_badges_バッジ定義を埋め込んで新しい順に返す() {
      // Given
      let baas = InMemoryBaas::new();
      baas.seed(
         tables::BADGES,
         vec![
            json!({"id": "b1", "name": "早起き"}),
            json!({"id": "b2", "name": "10日連続"}),
         ],
      );
      baas.seed(
         tables::USER_BADGES,
         vec![
            json!({"id": "ub1", "user_id": "u1", "badge_id": "b1", "unlocked_at": "2024-01-01T00:00:00Z"}),
            json!({"id": "ub2", "user_id": "u1", "badge_id": "b2", "unlocked_at": "2024-03-01T00:00:00Z"}),
         ],
      );
      let sut = create_test_app(&baas);

      // When
      let (status, body) = send(sut, get("/api/badges?user_id=u1")).await;

      // Then
      assert_eq!(status, StatusCode::OK);
      assert_eq!(body["total"], 2);
      assert_eq!(body["data"][0]["badge_id"], "b2");
      assert_eq!(body["data"][0]["badges"]["name"], "10日連続");
      assert_eq!(body["data"][1]["badges"]["name"], "早起き");
   }

   #[tokio::test]
   async fn test_get_badge_存在しないバッジは404() {
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);

      let (status, _) = send(sut, get("/api/badges/none")).await;

      assert_eq!(status, StatusCode::NOT_FOUND);
   }

   #[tokio::test]
   async fn test_unlock_badge_解除記録を作成する() {
      // Given
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);
      let request = json_request(
         Method::POST,
         "/api/badges/unlock",
         json!({"user_id": "u1", "badge_id": "b1"}),
      );

      // When
      let (status, body) = send(sut, request).await;

      // Then
      assert_eq!(status, StatusCode::CREATED);
      assert_eq!(body["data"]["badge_id"], "b1");
      assert_eq!(body["data"]["unlocked_at"], TEST_NOW);
   }

   #[tokio::test]
   async fn test_unlock_badge_解除済みなら400で挿入しない() {
      // Given
      let baas = InMemoryBaas::new();
      baas.seed(
         tables::USER_BADGES,
         vec![json!({"id": "ub1", "user_id": "u1", "badge_id": "b1"})],
      );
      let sut = create_test_app(&baas);
      let request = json_request(
         Method::POST,
         "/api/badges/unlock",
         json!({"user_id": "u1", "badge_id": "b1"}),
      );

      // When
      let (status, body) = send(sut, request).await;

      // Then
      assert_eq!(status, StatusCode::BAD_REQUEST);
      assert_eq!(body["detail"], "このバッジは解除済みです");
      assert_eq!(baas.rows(tables::USER_BADGES).len(), 1);
   }

   #[tokio::test]
   async fn test_unlock_badge_数値のbadge_idでも解除済みを判定する() {
      // Given
      let baas = InMemoryBaas::new();
      baas.seed(
         tables::USER_BADGES,
         vec![json!({"id": 1, "user_id": "u1", "badge_id": 7})],
      );
      let request = |badge_id: Value| {
         json_request(
            Method::POST,
            "/api/badges/unlock",
            json!({"user_id": "u1", "badge_id": badge_id}),
         )
      };

      // When
      let (unlocked_status, unlocked) = send(create_test_app(&baas), request(json!(8))).await;
      let (dup_status, _) = send(create_test_app(&baas), request(json!(7))).await;

      // Then
      assert_eq!(unlocked_status, StatusCode::CREATED);
      assert_eq!(unlocked["data"]["badge_id"], 8);
      assert_eq!(dup_status, StatusCode::BAD_REQUEST);
      let requests = baas.requests();
      assert!(requests[0].url.ends_with("user_id=eq.u1&badge_id=eq.8"), "{}", requests[0].url);
      assert_eq!(baas.rows(tables::USER_BADGES).len(), 2);
   }

   #[tokio::test]
   async fn test_unlock_badge_badge_idがないと400() {
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);

      let (status, body) = send(
         sut,
         json_request(Method::POST, "/api/badges/unlock", json!({"user_id": "u1"})),
      )
      .await;

      assert_eq!(status, StatusCode::BAD_REQUEST);
      assert_eq!(body["detail"], "badge_id は必須です");
      assert_eq!(baas.request_count(), 0);
   }
}
