//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュールで re-export し、フラットな API を提供
//! - ハンドラは必須項目を検証し、BaaS へのテーブル操作 1 回に変換する
//!
//! ## ハンドラ一覧
//!
//! - `health`: ヘルスチェック
//! - `checkin` / `user` / `badge` / `friend` / `group` / `plaza`: SNS 系リソース
//! - `task` / `journal` / `secret`: 個人記録
//! - `upload`: 画像アップロード

pub mod badge;
pub mod checkin;
pub mod friend;
pub mod group;
pub mod health;
pub mod journal;
pub mod plaza;
pub mod secret;
pub mod task;
pub mod upload;
pub mod user;

#[cfg(test)]
pub(crate) mod test_utils;

use std::sync::Arc;

use axum::{
   Json,
   http::StatusCode,
   response::{IntoResponse, Response},
};
use checkin_infra::{BaasClient, StoreResponse};
use checkin_shared::{ApiResponse, MessageResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

pub use badge::{get_badge, list_badges, unlock_badge};
pub use checkin::{CheckinState, create_checkin, delete_checkin, list_checkins, update_checkin};
pub use friend::list_friends;
pub use group::{get_group, list_groups};
pub use health::{ReadinessState, health_check, readiness_check};
pub use journal::{create_journal, delete_journal, list_journals, update_journal};
pub use plaza::list_plaza_posts;
pub use secret::{create_secret, delete_secret, list_secrets, update_secret};
pub use task::{create_task, delete_task, get_task_stats, list_tasks, update_task};
pub use upload::{UploadState, upload_image};
pub use user::{get_user, get_user_stats, update_user};

use crate::{clock::Clock, error::ApiError};

/// レコード系ハンドラの共有状態
pub struct RecordState {
   pub baas:  BaasClient,
   pub clock: Arc<dyn Clock>,
}

// --- 共通のリクエスト型 ---

/// `user_id` で絞り込む一覧取得のクエリ
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserIdQuery {
   /// 対象ユーザーの ID（必須）
   pub user_id: Option<String>,
}

/// 部分更新リクエスト
///
/// 任意のフィールドの部分集合をそのまま BaaS に渡す。
#[derive(Debug, Deserialize, ToSchema)]
#[schema(value_type = Object)]
pub struct RecordPatch(pub Map<String, Value>);

// --- OpenAPI 用のレスポンス型 ---
//
// BaaS のレコードはスキーマを持たないため、ドキュメント上は任意のオブジェクトとして扱う。

/// 単一レコードのレスポンス
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordResponse {
   #[schema(value_type = Object)]
   pub data: Value,
}

/// レコード一覧のレスポンス
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordListResponse {
   #[schema(value_type = Vec<Object>)]
   pub data: Vec<Value>,
}

/// ページネーション付きレコード一覧のレスポンス
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordPageResponse {
   #[schema(value_type = Vec<Object>)]
   pub data:      Vec<Value>,
   pub total:     Option<u64>,
   pub page:      u32,
   pub page_size: u32,
}

// --- 共通ヘルパー ---

/// 必須項目を取り出す。未指定・空白のみは欠落として扱う。
pub(crate) fn require(field: &str, value: Option<String>) -> Result<String, ApiError> {
   match value {
      Some(v) if !v.trim().is_empty() => Ok(v),
      _ => Err(ApiError::missing(field)),
   }
}

/// JSON ボディの必須項目を取り出す
///
/// 型は問わない。`null`・空白のみの文字列は欠落として扱う。
pub(crate) fn require_value(field: &str, value: Option<Value>) -> Result<Value, ApiError> {
   match value {
      None | Some(Value::Null) => Err(ApiError::missing(field)),
      Some(Value::String(s)) if s.trim().is_empty() => Err(ApiError::missing(field)),
      Some(v) => Ok(v),
   }
}

/// 任意項目が未指定・`null` なら既定値を使う
pub(crate) fn value_or(value: Option<Value>, default: Value) -> Value {
   match value {
      None | Some(Value::Null) => default,
      Some(v) => v,
   }
}

/// JSON 値を `eq` フィルタの値に変換する（文字列は引用符なし）
pub(crate) fn filter_value(value: &Value) -> String {
   match value {
      Value::String(s) => s.clone(),
      other => other.to_string(),
   }
}

/// 更新ボディが空でないことを確認する
pub(crate) fn require_changes(body: Map<String, Value>) -> Result<Map<String, Value>, ApiError> {
   if body.is_empty() {
      return Err(ApiError::validation("更新内容が空です"));
   }
   Ok(body)
}

/// ページ番号・ページサイズを検証する（1 以上、サイズは上限で切り詰め）
pub(crate) fn page_params(page: Option<u32>, size: Option<u32>, default_size: u32) -> Result<(u32, u32), ApiError> {
   let page = page.unwrap_or(1);
   let size = size.unwrap_or(default_size);
   if page == 0 {
      return Err(ApiError::validation("page は 1 以上で指定してください"));
   }
   if size == 0 {
      return Err(ApiError::validation("ページサイズは 1 以上で指定してください"));
   }
   Ok((page, size.min(MAX_PAGE_SIZE)))
}

pub(crate) const MAX_PAGE_SIZE: u32 = 100;

/// 単一行の結果を取り出す。0 行なら 404。
pub(crate) fn single_row(response: StoreResponse, resource: &'static str, id: &str) -> Result<Value, ApiError> {
   response
      .into_first()
      .ok_or_else(|| ApiError::not_found(resource, id))
}

/// 200 `{ "data": ... }`
pub(crate) fn ok_data<T: Serialize>(data: T) -> Response {
   (StatusCode::OK, Json(ApiResponse::new(data))).into_response()
}

/// 201 `{ "data": ... }`
pub(crate) fn created_data<T: Serialize>(data: T) -> Response {
   (StatusCode::CREATED, Json(ApiResponse::new(data))).into_response()
}

/// 200 `{ "message": ... }`
pub(crate) fn deleted(message: &str) -> Response {
   (StatusCode::OK, Json(MessageResponse::new(message))).into_response()
}
