//! # チェックイン API ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/checkins?user_id=` - ユーザーのチェックイン一覧（新しい順）
//! - `POST /api/checkins` - チェックイン作成
//! - `PUT /api/checkins/{id}` - チェックイン更新
//! - `DELETE /api/checkins/{id}` - チェックイン削除
//!
//! 作成時の位置情報は [`clamp_location`] で正規化し、住所がなければ
//! [`Geocoder`] で逆引きして補完する。

use std::sync::Arc;

use axum::{
   Json,
   extract::{
      Path,
      Query,
      State,
      rejection::{JsonRejection, QueryRejection},
   },
   response::Response,
};
use checkin_infra::{BaasClient, InfraError, query::Direction, tables};
use checkin_shared::{ErrorResponse, MessageResponse};
use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::{
   RecordListResponse,
   RecordPatch,
   RecordResponse,
   UserIdQuery,
   created_data,
   deleted,
   ok_data,
   require,
   require_changes,
   require_value,
   single_row,
};
use crate::{
   client::{Geocoder, clamp_location},
   clock::Clock,
   error::{ApiError, log_and_convert_store_error},
};

/// チェックイン API の共有状態
pub struct CheckinState {
   pub baas:     BaasClient,
   pub clock:    Arc<dyn Clock>,
   pub geocoder: Arc<dyn Geocoder>,
}

/// チェックイン作成リクエスト
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCheckinRequest {
   #[schema(value_type = Option<String>)]
   pub user_id:  Option<Value>,
   #[schema(value_type = Option<String>)]
   pub content:  Option<Value>,
   /// 画像 URL の配列（省略時は空配列）
   #[schema(value_type = Option<Vec<String>>)]
   pub images:   Option<Value>,
   /// `{ latitude, longitude, accuracy?, address? }`
   #[schema(value_type = Option<Object>)]
   pub location: Option<Value>,
}

/// GET /api/checkins
#[utoipa::path(
   get,
   path = "/api/checkins",
   tag = "checkins",
   params(UserIdQuery),
   responses(
      (status = 200, description = "チェックイン一覧", body = RecordListResponse),
      (status = 400, description = "user_id が未指定", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn list_checkins(
   State(state): State<Arc<CheckinState>>,
   query: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
   let Query(query) = query?;
   let user_id = require("user_id", query.user_id)?;

   let response = state
      .baas
      .from(tables::CHECKINS)
      .select("*")
      .eq("user_id", user_id)
      .order("created_at", Direction::Desc)
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("チェックイン一覧取得", e))?;

   Ok(ok_data(response.data))
}

/// POST /api/checkins
///
/// `created_at` はサーバー側で付与する。位置情報が不正な場合は `null` として保存する。
#[utoipa::path(
   post,
   path = "/api/checkins",
   tag = "checkins",
   request_body = CreateCheckinRequest,
   responses(
      (status = 201, description = "作成したチェックイン", body = RecordResponse),
      (status = 400, description = "必須項目の欠落", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn create_checkin(
   State(state): State<Arc<CheckinState>>,
   payload: Result<Json<CreateCheckinRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
   let Json(req) = payload?;
   let user_id = require_value("user_id", req.user_id)?;
   let content = require_value("content", req.content)?;

   let images = match req.images {
      None | Some(Value::Null) => json!([]),
      Some(images) => images,
   };
   let location = resolve_location(state.geocoder.as_ref(), req.location).await?;

   let record = json!({
      "user_id": user_id,
      "content": content,
      "images": images,
      "location": location,
      "created_at": state.clock.timestamp(),
   });

   let created = state
      .baas
      .from(tables::CHECKINS)
      .insert(record)
      .execute_single()
      .await
      .map_err(|e| log_and_convert_store_error("チェックイン作成", e))?;

   tracing::info!(user_id = %user_id, "チェックインを作成しました");
   Ok(created_data(created))
}

/// 位置情報を正規化し、住所が未指定なら逆引きで補完する
async fn resolve_location(geocoder: &dyn Geocoder, raw: Option<Value>) -> Result<Value, InfraError> {
   let Some(raw) = raw.filter(|v| !v.is_null()) else {
      return Ok(Value::Null);
   };
   let Some(mut location) = clamp_location(&raw) else {
      tracing::warn!(location = %raw, "位置情報が不正なため破棄します");
      return Ok(Value::Null);
   };
   if location.address.is_none() {
      location.address = geocoder.reverse(location.latitude, location.longitude).await;
   }
   Ok(serde_json::to_value(location)?)
}

/// PUT /api/checkins/{id}
#[utoipa::path(
   put,
   path = "/api/checkins/{id}",
   tag = "checkins",
   params(("id" = String, Path, description = "チェックイン ID")),
   request_body = RecordPatch,
   responses(
      (status = 200, description = "更新後のチェックイン", body = RecordResponse),
      (status = 400, description = "更新内容が空", body = ErrorResponse),
      (status = 404, description = "チェックインが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_checkin(
   State(state): State<Arc<CheckinState>>,
   Path(id): Path<String>,
   payload: Result<Json<RecordPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
   let Json(RecordPatch(changes)) = payload?;
   let changes = require_changes(changes)?;

   let response = state
      .baas
      .from(tables::CHECKINS)
      .update(Value::Object(changes))
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("チェックイン更新", e))?;

   Ok(ok_data(single_row(response, "checkin", &id)?))
}

/// DELETE /api/checkins/{id}
#[utoipa::path(
   delete,
   path = "/api/checkins/{id}",
   tag = "checkins",
   params(("id" = String, Path, description = "チェックイン ID")),
   responses(
      (status = 200, description = "削除完了", body = MessageResponse),
      (status = 404, description = "チェックインが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_checkin(
   State(state): State<Arc<CheckinState>>,
   Path(id): Path<String>,
) -> Result<Response, ApiError> {
   let response = state
      .baas
      .from(tables::CHECKINS)
      .delete()
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("チェックイン削除", e))?;

   single_row(response, "checkin", &id)?;
   Ok(deleted("チェックインを削除しました"))
}

#[cfg(test)]
mod tests {
   use async_trait::async_trait;
   use axum::http::{Method, StatusCode};
   use checkin_infra::mock::InMemoryBaas;
   use pretty_assertions::assert_eq;
   use serde_json::json;

   use super::{super::test_utils::*, *};

   struct StubGeocoder;

   #[async_trait]
   impl Geocoder for StubGeocoder {
      async fn reverse(&self, _latitude: f64, _longitude: f64) -> Option<String> {
         Some("東京都千代田区".to_string())
      }
   }

   #[tokio::test]
   async fn test_create_checkin_正常系で201とタイムスタンプ付きレコードを返す() {
      // Given
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);
      let request = json_request(
         Method::POST,
         "/api/checkins",
         json!({"user_id": "u1", "content": "朝ラン 5km"}),
      );

      // When
      let (status, body) = send(sut, request).await;

      // Then
      assert_eq!(status, StatusCode::CREATED);
      assert_eq!(body["data"]["user_id"], "u1");
      assert_eq!(body["data"]["content"], "朝ラン 5km");
      assert_eq!(body["data"]["images"], json!([]));
      assert_eq!(body["data"]["location"], Value::Null);
      assert_eq!(body["data"]["created_at"], TEST_NOW);
      assert!(body["data"]["id"].is_string());
      assert_eq!(baas.rows(tables::CHECKINS).len(), 1);
   }

   #[tokio::test]
   async fn test_create_checkin_数値のuser_idもそのまま保存する() {
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);
      let request = json_request(
         Method::POST,
         "/api/checkins",
         json!({"user_id": 42, "content": "x"}),
      );

      let (status, body) = send(sut, request).await;

      assert_eq!(status, StatusCode::CREATED);
      assert_eq!(body["data"]["user_id"], 42);
   }

   #[tokio::test]
   async fn test_create_checkin_作成結果が空なら500() {
      // Given
      let baas = InMemoryBaas::new();
      baas.fail_with(StatusCode::CREATED, "");
      let sut = create_test_app(&baas);
      let request = json_request(
         Method::POST,
         "/api/checkins",
         json!({"user_id": "u1", "content": "x"}),
      );

      // When
      let (status, body) = send(sut, request).await;

      // Then
      assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
      assert_eq!(body["detail"], "BaaS が checkins の結果を返しませんでした");
   }

   #[tokio::test]
   async fn test_create_checkin_contentがないと400でbaasを呼ばない() {
      // Given
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);
      let request = json_request(Method::POST, "/api/checkins", json!({"user_id": "u1"}));

      // When
      let (status, body) = send(sut, request).await;

      // Then
      assert_eq!(status, StatusCode::BAD_REQUEST);
      assert_eq!(body["detail"], "content は必須です");
      assert_eq!(baas.request_count(), 0);
   }

   #[tokio::test]
   async fn test_create_checkin_不正なjsonは400() {
      // Given
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);
      let request = axum::http::Request::builder()
         .method(Method::POST)
         .uri("/api/checkins")
         .header("content-type", "application/json")
         .body(axum::body::Body::from("{not json"))
         .unwrap();

      // When
      let (status, _) = send(sut, request).await;

      // Then
      assert_eq!(status, StatusCode::BAD_REQUEST);
      assert_eq!(baas.request_count(), 0);
   }

   #[tokio::test]
   async fn test_create_checkin_範囲外の位置情報はnullで保存される() {
      // Given
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);
      let request = json_request(
         Method::POST,
         "/api/checkins",
         json!({
            "user_id": "u1",
            "content": "x",
            "location": {"latitude": 95.0, "longitude": 10.0}
         }),
      );

      // When
      let (status, body) = send(sut, request).await;

      // Then
      assert_eq!(status, StatusCode::CREATED);
      assert_eq!(body["data"]["location"], Value::Null);
   }

   #[tokio::test]
   async fn test_resolve_location_住所がなければ逆引きで補完する() {
      let raw = json!({"latitude": "35.6812345678", "longitude": 139.7671, "accuracy": 20});

      let result = resolve_location(&StubGeocoder, Some(raw)).await.unwrap();

      assert_eq!(
         result,
         json!({
            "latitude": 35.681235,
            "longitude": 139.7671,
            "accuracy": 20.0,
            "address": "東京都千代田区"
         })
      );
   }

   #[tokio::test]
   async fn test_resolve_location_指定済みの住所は上書きしない() {
      let raw = json!({"latitude": 35.0, "longitude": 139.0, "address": "自宅"});

      let result = resolve_location(&StubGeocoder, Some(raw)).await.unwrap();

      assert_eq!(result["address"], "自宅");
   }

   #[tokio::test]
   async fn test_list_checkins_新しい順に返す() {
      // Given
      let baas = InMemoryBaas::new();
      baas.seed(
         tables::CHECKINS,
         vec![
            json!({"id": "c1", "user_id": "u1", "created_at": "2024-01-01T00:00:00Z"}),
            json!({"id": "c2", "user_id": "u1", "created_at": "2024-02-01T00:00:00Z"}),
            json!({"id": "c3", "user_id": "u2", "created_at": "2024-03-01T00:00:00Z"}),
         ],
      );
      let sut = create_test_app(&baas);

      // When
      let (status, body) = send(sut, get("/api/checkins?user_id=u1")).await;

      // Then
      assert_eq!(status, StatusCode::OK);
      let ids: Vec<&str> = body["data"]
         .as_array()
         .unwrap()
         .iter()
         .map(|r| r["id"].as_str().unwrap())
         .collect();
      assert_eq!(ids, vec!["c2", "c1"]);
   }

   #[tokio::test]
   async fn test_list_checkins_user_idがないと400() {
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);

      let (status, body) = send(sut, get("/api/checkins")).await;

      assert_eq!(status, StatusCode::BAD_REQUEST);
      assert_eq!(body["detail"], "user_id は必須です");
      assert_eq!(baas.request_count(), 0);
   }

   #[tokio::test]
   async fn test_update_checkin_存在しないidは404() {
      // Given
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);
      let request = json_request(Method::PUT, "/api/checkins/missing", json!({"content": "x"}));

      // When
      let (status, body) = send(sut, request).await;

      // Then
      assert_eq!(status, StatusCode::NOT_FOUND);
      assert_eq!(body["type"], "https://checkin.example.com/errors/checkin-not-found");
   }

   #[tokio::test]
   async fn test_update_checkin_空のボディは400() {
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);

      let (status, _) = send(sut, json_request(Method::PUT, "/api/checkins/c1", json!({}))).await;

      assert_eq!(status, StatusCode::BAD_REQUEST);
      assert_eq!(baas.request_count(), 0);
   }

   #[tokio::test]
   async fn test_delete_checkin_削除するとメッセージを返す() {
      // Given
      let baas = InMemoryBaas::new();
      baas.seed(tables::CHECKINS, vec![json!({"id": "c1", "user_id": "u1"})]);
      let sut = create_test_app(&baas);

      // When
      let (status, body) = send(sut, delete("/api/checkins/c1")).await;

      // Then
      assert_eq!(status, StatusCode::OK);
      assert_eq!(body["message"], "チェックインを削除しました");
      assert!(baas.rows(tables::CHECKINS).is_empty());
   }

   #[tokio::test]
   async fn test_list_checkins_baasエラーは500で生のエラー文を返す() {
      // Given
      let baas = InMemoryBaas::new();
      baas.fail_with(StatusCode::SERVICE_UNAVAILABLE, "upstream down");
      let sut = create_test_app(&baas);

      // When
      let (status, body) = send(sut, get("/api/checkins?user_id=u1")).await;

      // Then
      assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
      assert_eq!(body["detail"], "upstream down");
   }
}
