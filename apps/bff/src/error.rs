//! # BFF エラーハンドリング
//!
//! ハンドラ共通のエラー型と、axum レスポンスへの変換。
//!
//! | 種別 | ステータス | 用途 |
//! |------|-----------|------|
//! | [`ApiError::Validation`] | 400 | 必須項目の欠落、不正な JSON / multipart |
//! | [`ApiError::NotFound`] | 404 | 単一行の取得・更新・削除で対象がない |
//! | [`ApiError::Store`] | 500 | BaaS の非 2xx、通信失敗 |
//!
//! エラーボディは RFC 9457 Problem Details（[`ErrorResponse`]）。

use axum::{
   Json,
   extract::{
      multipart::{MultipartError, MultipartRejection},
      rejection::{JsonRejection, QueryRejection},
   },
   http::StatusCode,
   response::{IntoResponse, Response},
};
use checkin_infra::{InfraError, InfraErrorKind};
use checkin_shared::ErrorResponse;
use thiserror::Error;

/// ハンドラで発生するエラー
#[derive(Debug, Error)]
pub enum ApiError {
   /// リクエストの内容が不正（400 Bad Request）
   #[error("{0}")]
   Validation(String),

   /// 対象のレコードが存在しない（404 Not Found）
   #[error("{resource} が見つかりません（id={id}）")]
   NotFound { resource: &'static str, id: String },

   /// BaaS 呼び出しの失敗（500 Internal Server Error）
   #[error(transparent)]
   Store(#[from] InfraError),
}

impl ApiError {
   pub fn validation(detail: impl Into<String>) -> Self {
      Self::Validation(detail.into())
   }

   pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
      Self::NotFound {
         resource,
         id: id.into(),
      }
   }

   /// 必須項目の欠落
   pub fn missing(field: &str) -> Self {
      Self::Validation(format!("{field} は必須です"))
   }
}

impl IntoResponse for ApiError {
   fn into_response(self) -> Response {
      match self {
         ApiError::Validation(detail) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::validation_error(detail)),
         )
            .into_response(),
         ApiError::NotFound { resource, id } => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
               &format!("{resource}-not-found"),
               "Not Found",
               404,
               format!("{resource} が見つかりません（id={id}）"),
            )),
         )
            .into_response(),
         // 組み立て誤りはクライアント入力に起因するため 400 として返す
         ApiError::Store(err) if matches!(err.kind(), InfraErrorKind::InvalidQuery(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::validation_error(err.to_string())),
         )
            .into_response(),
         ApiError::Store(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::store_error(err.to_string())),
         )
            .into_response(),
      }
   }
}

impl From<JsonRejection> for ApiError {
   fn from(rejection: JsonRejection) -> Self {
      Self::Validation(format!("JSON ボディが不正です: {}", rejection.body_text()))
   }
}

impl From<QueryRejection> for ApiError {
   fn from(rejection: QueryRejection) -> Self {
      Self::Validation(format!("クエリパラメータが不正です: {}", rejection.body_text()))
   }
}

impl From<MultipartRejection> for ApiError {
   fn from(rejection: MultipartRejection) -> Self {
      Self::Validation(format!("multipart ボディが不正です: {}", rejection.body_text()))
   }
}

impl From<MultipartError> for ApiError {
   fn from(err: MultipartError) -> Self {
      Self::Validation(format!("multipart ボディが不正です: {}", err.body_text()))
   }
}

/// BaaS エラーをログ付きで [`ApiError`] に変換する
///
/// `context` は操作名（例: `"チェックイン作成"`）。
pub fn log_and_convert_store_error(context: &str, err: InfraError) -> ApiError {
   match err.kind() {
      InfraErrorKind::InvalidQuery(_) => {
         tracing::warn!(
            error.category = "client_input",
            error.kind = err.kind_name(),
            "{}で不正なクエリ: {}",
            context,
            err
         );
      }
      _ => {
         tracing::error!(
            error.category = "external_service",
            error.kind = err.kind_name(),
            error.status = err.store_status(),
            span_trace = %err.span_trace(),
            "{}で BaaS エラー: {}",
            context,
            err
         );
      }
   }
   ApiError::Store(err)
}
