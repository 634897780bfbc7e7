//! # ユーザー API ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/users/{id}` - ユーザー情報
//! - `PUT /api/users/{id}` - ユーザー情報更新
//! - `GET /api/users/{id}/stats` - ユーザー統計（`user_stats` ビュー）

use std::sync::Arc;

use axum::{
   Json,
   extract::{Path, State, rejection::JsonRejection},
   response::Response,
};
use checkin_infra::tables;
use checkin_shared::ErrorResponse;
use serde_json::{Value, json};

use super::{RecordPatch, RecordResponse, RecordState, ok_data, require_changes, single_row};
use crate::error::{ApiError, log_and_convert_store_error};

/// GET /api/users/{id}
#[utoipa::path(
   get,
   path = "/api/users/{id}",
   tag = "users",
   params(("id" = String, Path, description = "ユーザー ID")),
   responses(
      (status = 200, description = "ユーザー情報", body = RecordResponse),
      (status = 404, description = "ユーザーが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_user(
   State(state): State<Arc<RecordState>>,
   Path(id): Path<String>,
) -> Result<Response, ApiError> {
   let response = state
      .baas
      .from(tables::USERS)
      .select("*")
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("ユーザー取得", e))?;

   Ok(ok_data(single_row(response, "user", &id)?))
}

/// PUT /api/users/{id}
///
/// `updated_at` が指定されていなければ現在時刻を補う。
#[utoipa::path(
   put,
   path = "/api/users/{id}",
   tag = "users",
   params(("id" = String, Path, description = "ユーザー ID")),
   request_body = RecordPatch,
   responses(
      (status = 200, description = "更新後のユーザー情報", body = RecordResponse),
      (status = 400, description = "更新内容が空", body = ErrorResponse),
      (status = 404, description = "ユーザーが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_user(
   State(state): State<Arc<RecordState>>,
   Path(id): Path<String>,
   payload: Result<Json<RecordPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
   let Json(RecordPatch(changes)) = payload?;
   let mut changes = require_changes(changes)?;
   changes
      .entry("updated_at")
      .or_insert_with(|| Value::String(state.clock.timestamp()));

   let response = state
      .baas
      .from(tables::USERS)
      .update(Value::Object(changes))
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("ユーザー更新", e))?;

   Ok(ok_data(single_row(response, "user", &id)?))
}

/// GET /api/users/{id}/stats
///
/// 統計行がまだなければ空オブジェクトを返す。
#[utoipa::path(
   get,
   path = "/api/users/{id}/stats",
   tag = "users",
   params(("id" = String, Path, description = "ユーザー ID")),
   responses(
      (status = 200, description = "ユーザー統計", body = RecordResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_user_stats(
   State(state): State<Arc<RecordState>>,
   Path(id): Path<String>,
) -> Result<Response, ApiError> {
   let response = state
      .baas
      .from(tables::USER_STATS)
      .select("*")
      .eq("user_id", id)
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("ユーザー統計取得", e))?;

   Ok(ok_data(response.into_first().unwrap_or_else(|| json!({}))))
}
