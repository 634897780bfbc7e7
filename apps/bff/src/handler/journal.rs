//! # 手帳 API ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/journals?user_id=` - 手帳エントリ一覧
//! - `POST /api/journals` - エントリ作成
//! - `PUT /api/journals/{id}` - エントリ更新
//! - `DELETE /api/journals/{id}` - エントリ削除

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
use checkin_infra::tables;
use checkin_shared::{ErrorResponse, MessageResponse};
use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::{
   RecordListResponse,
   RecordPatch,
   RecordResponse,
   RecordState,
   UserIdQuery,
   created_data,
   deleted,
   ok_data,
   require,
   require_changes,
   require_value,
   single_row,
   value_or,
};
use crate::error::{ApiError, log_and_convert_store_error};

/// 手帳エントリ作成リクエスト
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateJournalRequest {
   #[schema(value_type = Option<String>)]
   pub user_id:   Option<Value>,
   #[schema(value_type = Option<String>)]
   pub title:     Option<Value>,
   #[schema(value_type = Option<String>)]
   pub content:   Option<Value>,
   #[schema(value_type = Option<String>)]
   pub mood:      Option<Value>,
   #[schema(value_type = Option<String>)]
   pub weather:   Option<Value>,
   /// 省略時は空配列
   #[schema(value_type = Option<Vec<String>>)]
   pub tags:      Option<Value>,
   /// 画像 URL の配列（省略時は空配列）
   #[schema(value_type = Option<Vec<String>>)]
   pub images:    Option<Value>,
   /// 省略時は非公開
   #[schema(value_type = Option<bool>)]
   pub is_public: Option<Value>,
}

/// GET /api/journals
#[utoipa::path(
   get,
   path = "/api/journals",
   tag = "journals",
   params(UserIdQuery),
   responses(
      (status = 200, description = "手帳エントリ一覧", body = RecordListResponse),
      (status = 400, description = "user_id が未指定", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn list_journals(
   State(state): State<Arc<RecordState>>,
   query: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
   let Query(query) = query?;
   let user_id = require("user_id", query.user_id)?;

   let response = state
      .baas
      .from(tables::JOURNALS)
      .select("*")
      .eq("user_id", user_id)
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("手帳一覧取得", e))?;

   Ok(ok_data(response.data))
}

/// POST /api/journals
#[utoipa::path(
   post,
   path = "/api/journals",
   tag = "journals",
   request_body = CreateJournalRequest,
   responses(
      (status = 201, description = "作成したエントリ", body = RecordResponse),
      (status = 400, description = "必須項目の欠落", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn create_journal(
   State(state): State<Arc<RecordState>>,
   payload: Result<Json<CreateJournalRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
   let Json(req) = payload?;
   let user_id = require_value("user_id", req.user_id)?;
   let title = require_value("title", req.title)?;
   let content = require_value("content", req.content)?;

   let now = state.clock.timestamp();
   let record = json!({
      "user_id": user_id,
      "title": title,
      "content": content,
      "mood": req.mood,
      "weather": req.weather,
      "tags": value_or(req.tags, json!([])),
      "images": value_or(req.images, json!([])),
      "is_public": value_or(req.is_public, json!(false)),
      "created_at": now,
      "updated_at": now,
   });

   let created = state
      .baas
      .from(tables::JOURNALS)
      .insert(record)
      .execute_single()
      .await
      .map_err(|e| log_and_convert_store_error("手帳作成", e))?;

   Ok(created_data(created))
}

/// PUT /api/journals/{id}
#[utoipa::path(
   put,
   path = "/api/journals/{id}",
   tag = "journals",
   params(("id" = String, Path, description = "エントリ ID")),
   request_body = RecordPatch,
   responses(
      (status = 200, description = "更新後のエントリ", body = RecordResponse),
      (status = 400, description = "更新内容が空", body = ErrorResponse),
      (status = 404, description = "エントリが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_journal(
   State(state): State<Arc<RecordState>>,
   Path(id): Path<String>,
   payload: Result<Json<RecordPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
   let Json(RecordPatch(changes)) = payload?;
   let mut changes = require_changes(changes)?;
   changes.insert("updated_at".to_string(), Value::String(state.clock.timestamp()));

   let response = state
      .baas
      .from(tables::JOURNALS)
      .update(Value::Object(changes))
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("手帳更新", e))?;

   Ok(ok_data(single_row(response, "journal", &id)?))
}

/// DELETE /api/journals/{id}
#[utoipa::path(
   delete,
   path = "/api/journals/{id}",
   tag = "journals",
   params(("id" = String, Path, description = "エントリ ID")),
   responses(
      (status = 200, description = "削除完了", body = MessageResponse),
      (status = 404, description = "エントリが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_journal(
   State(state): State<Arc<RecordState>>,
   Path(id): Path<String>,
) -> Result<Response, ApiError> {
   let response = state
      .baas
      .from(tables::JOURNALS)
      .delete()
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("手帳削除", e))?;

   single_row(response, "journal", &id)?;
   Ok(deleted("手帳エントリを削除しました"))
}
