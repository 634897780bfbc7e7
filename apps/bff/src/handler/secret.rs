//! # 秘密の部屋 API ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/secrets?user_id=&page=&page_size=` - メッセージ一覧（新しい順、総件数付き）
//! - `POST /api/secrets` - メッセージ作成
//! - `PUT /api/secrets/{id}` - メッセージ更新
//! - `DELETE /api/secrets/{id}` - メッセージ削除
//!
//! 一覧の総件数は、ページ取得と同じリクエストで `Prefer: count=exact` を指定して得る。

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
use checkin_infra::{
   query::{CountOption, Direction},
   tables,
};
use checkin_shared::{ErrorResponse, MessageResponse, PaginatedResponse};
use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::{IntoParams, ToSchema};

use super::{
   RecordPageResponse,
   RecordPatch,
   RecordResponse,
   RecordState,
   created_data,
   deleted,
   ok_data,
   page_params,
   require,
   require_changes,
   require_value,
   single_row,
};
use crate::error::{ApiError, log_and_convert_store_error};

const DEFAULT_PAGE_SIZE: u32 = 10;

/// メッセージ一覧のクエリ
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSecretsQuery {
   /// 対象ユーザーの ID（必須）
   pub user_id:   Option<String>,
   /// ページ番号（1 始まり、デフォルト 1）
   pub page:      Option<u32>,
   /// 1 ページあたりの件数（デフォルト 10、上限 100）
   pub page_size: Option<u32>,
}

/// メッセージ作成リクエスト
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSecretRequest {
   #[schema(value_type = Option<String>)]
   pub user_id:   Option<Value>,
   #[schema(value_type = Option<String>)]
   pub content:   Option<Value>,
   /// 添付画像の URL
   #[schema(value_type = Option<String>)]
   pub image_url: Option<Value>,
}

/// GET /api/secrets
#[utoipa::path(
   get,
   path = "/api/secrets",
   tag = "secrets",
   params(ListSecretsQuery),
   responses(
      (status = 200, description = "メッセージ一覧", body = RecordPageResponse),
      (status = 400, description = "user_id が未指定、またはページ指定が不正", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn list_secrets(
   State(state): State<Arc<RecordState>>,
   query: Result<Query<ListSecretsQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
   let Query(query) = query?;
   let user_id = require("user_id", query.user_id)?;
   let (page, page_size) = page_params(query.page, query.page_size, DEFAULT_PAGE_SIZE)?;

   let response = state
      .baas
      .from(tables::SECRETS)
      .select("*")
      .eq("user_id", user_id)
      .order("created_at", Direction::Desc)
      .paginate(page, page_size)
      .count(CountOption::Exact)
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("メッセージ一覧取得", e))?;

   let body = PaginatedResponse {
      data: response.data,
      total: response.count,
      page,
      page_size,
   };
   Ok((StatusCode::OK, Json(body)).into_response())
}

/// POST /api/secrets
#[utoipa::path(
   post,
   path = "/api/secrets",
   tag = "secrets",
   request_body = CreateSecretRequest,
   responses(
      (status = 201, description = "作成したメッセージ", body = RecordResponse),
      (status = 400, description = "必須項目の欠落", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn create_secret(
   State(state): State<Arc<RecordState>>,
   payload: Result<Json<CreateSecretRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
   let Json(req) = payload?;
   let user_id = require_value("user_id", req.user_id)?;
   let content = require_value("content", req.content)?;

   let now = state.clock.timestamp();
   let mut record = json!({
      "user_id": user_id,
      "content": content,
      "created_at": now,
      "updated_at": now,
   });
   if let (Some(image_url), Some(obj)) = (req.image_url, record.as_object_mut()) {
      obj.insert("image_url".to_string(), image_url);
   }

   let created = state
      .baas
      .from(tables::SECRETS)
      .insert(record)
      .execute_single()
      .await
      .map_err(|e| log_and_convert_store_error("メッセージ作成", e))?;

   Ok(created_data(created))
}

/// PUT /api/secrets/{id}
#[utoipa::path(
   put,
   path = "/api/secrets/{id}",
   tag = "secrets",
   params(("id" = String, Path, description = "メッセージ ID")),
   request_body = RecordPatch,
   responses(
      (status = 200, description = "更新後のメッセージ", body = RecordResponse),
      (status = 400, description = "更新内容が空", body = ErrorResponse),
      (status = 404, description = "メッセージが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_secret(
   State(state): State<Arc<RecordState>>,
   Path(id): Path<String>,
   payload: Result<Json<RecordPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
   let Json(RecordPatch(changes)) = payload?;
   let mut changes = require_changes(changes)?;
   changes.insert("updated_at".to_string(), Value::String(state.clock.timestamp()));

   let response = state
      .baas
      .from(tables::SECRETS)
      .update(Value::Object(changes))
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("メッセージ更新", e))?;

   Ok(ok_data(single_row(response, "secret", &id)?))
}

/// DELETE /api/secrets/{id}
#[utoipa::path(
   delete,
   path = "/api/secrets/{id}",
   tag = "secrets",
   params(("id" = String, Path, description = "メッセージ ID")),
   responses(
      (status = 200, description = "削除完了", body = MessageResponse),
      (status = 404, description = "メッセージが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_secret(
   State(state): State<Arc<RecordState>>,
   Path(id): Path<String>,
) -> Result<Response, ApiError> {
   let response = state
      .baas
      .from(tables::SECRETS)
      .delete()
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("メッセージ削除", e))?;

   single_row(response, "secret", &id)?;
   Ok(deleted("メッセージを削除しました"))
}
