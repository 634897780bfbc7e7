//! # タスク API ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/tasks?user_id=&status=` - タスク一覧（status は任意の絞り込み）
//! - `POST /api/tasks` - タスク作成
//! - `PUT /api/tasks/{id}` - タスク更新
//! - `DELETE /api/tasks/{id}` - タスク削除
//! - `GET /api/tasks/stats?user_id=` - タスク統計（`user_task_stats` ビュー）

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
use utoipa::{IntoParams, ToSchema};

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

const DEFAULT_STATUS: &str = "pending";
const DEFAULT_PRIORITY: &str = "medium";

/// タスク一覧のクエリ
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTasksQuery {
   /// 対象ユーザーの ID（必須）
   pub user_id: Option<String>,
   /// ステータスで絞り込む（例: `pending`, `done`）
   pub status:  Option<String>,
}

/// タスク作成リクエスト
///
/// 各フィールドの型は検証せず、そのまま BaaS に渡す。
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
   #[schema(value_type = Option<String>)]
   pub user_id:     Option<Value>,
   #[schema(value_type = Option<String>)]
   pub title:       Option<Value>,
   #[schema(value_type = Option<String>)]
   pub due_date:    Option<Value>,
   #[schema(value_type = Option<String>)]
   pub description: Option<Value>,
   /// 省略時は `pending`
   #[schema(value_type = Option<String>)]
   pub status:      Option<Value>,
   /// 省略時は `medium`
   #[schema(value_type = Option<String>)]
   pub priority:    Option<Value>,
   #[schema(value_type = Option<String>)]
   pub category:    Option<Value>,
   #[schema(value_type = Option<Object>)]
   pub reminder:    Option<Value>,
}

/// GET /api/tasks
#[utoipa::path(
   get,
   path = "/api/tasks",
   tag = "tasks",
   params(ListTasksQuery),
   responses(
      (status = 200, description = "タスク一覧", body = RecordListResponse),
      (status = 400, description = "user_id が未指定", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn list_tasks(
   State(state): State<Arc<RecordState>>,
   query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
   let Query(query) = query?;
   let user_id = require("user_id", query.user_id)?;

   let mut select = state
      .baas
      .from(tables::TASKS)
      .select("*")
      .eq("user_id", user_id);
   if let Some(status) = query.status.filter(|s| !s.is_empty()) {
      select = select.eq("status", status);
   }
   let response = select
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("タスク一覧取得", e))?;

   Ok(ok_data(response.data))
}

/// POST /api/tasks
#[utoipa::path(
   post,
   path = "/api/tasks",
   tag = "tasks",
   request_body = CreateTaskRequest,
   responses(
      (status = 201, description = "作成したタスク", body = RecordResponse),
      (status = 400, description = "必須項目の欠落", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn create_task(
   State(state): State<Arc<RecordState>>,
   payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
   let Json(req) = payload?;
   let user_id = require_value("user_id", req.user_id)?;
   let title = require_value("title", req.title)?;
   let due_date = require_value("due_date", req.due_date)?;

   let now = state.clock.timestamp();
   let record = json!({
      "user_id": user_id,
      "title": title,
      "description": req.description,
      "due_date": due_date,
      "status": value_or(req.status, json!(DEFAULT_STATUS)),
      "priority": value_or(req.priority, json!(DEFAULT_PRIORITY)),
      "category": req.category,
      "reminder": req.reminder,
      "created_at": now,
      "updated_at": now,
   });

   let created = state
      .baas
      .from(tables::TASKS)
      .insert(record)
      .execute_single()
      .await
      .map_err(|e| log_and_convert_store_error("タスク作成", e))?;

   Ok(created_data(created))
}

/// PUT /api/tasks/{id}
///
/// `updated_at` は常に現在時刻で上書きする。
#[utoipa::path(
   put,
   path = "/api/tasks/{id}",
   tag = "tasks",
   params(("id" = String, Path, description = "タスク ID")),
   request_body = RecordPatch,
   responses(
      (status = 200, description = "更新後のタスク", body = RecordResponse),
      (status = 400, description = "更新内容が空", body = ErrorResponse),
      (status = 404, description = "タスクが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_task(
   State(state): State<Arc<RecordState>>,
   Path(id): Path<String>,
   payload: Result<Json<RecordPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
   let Json(RecordPatch(changes)) = payload?;
   let mut changes = require_changes(changes)?;
   changes.insert("updated_at".to_string(), Value::String(state.clock.timestamp()));

   let response = state
      .baas
      .from(tables::TASKS)
      .update(Value::Object(changes))
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("タスク更新", e))?;

   Ok(ok_data(single_row(response, "task", &id)?))
}

/// DELETE /api/tasks/{id}
#[utoipa::path(
   delete,
   path = "/api/tasks/{id}",
   tag = "tasks",
   params(("id" = String, Path, description = "タスク ID")),
   responses(
      (status = 200, description = "削除完了", body = MessageResponse),
      (status = 404, description = "タスクが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_task(
   State(state): State<Arc<RecordState>>,
   Path(id): Path<String>,
) -> Result<Response, ApiError> {
   let response = state
      .baas
      .from(tables::TASKS)
      .delete()
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("タスク削除", e))?;

   single_row(response, "task", &id)?;
   Ok(deleted("タスクを削除しました"))
}

/// GET /api/tasks/stats
#[utoipa::path(
   get,
   path = "/api/tasks/stats",
   tag = "tasks",
   params(UserIdQuery),
   responses(
      (status = 200, description = "タスク統計（未集計なら空オブジェクト）", body = RecordResponse),
      (status = 400, description = "user_id が未指定", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn get_task_stats(
   State(state): State<Arc<RecordState>>,
   query: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
   let Query(query) = query?;
   let user_id = require("user_id", query.user_id)?;

   let response = state
      .baas
      .from(tables::USER_TASK_STATS)
      .select("*")
      .eq("user_id", user_id)
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("タスク統計取得", e))?;

   Ok(ok_data(response.into_first().unwrap_or_else(|| json!({}))))
}
