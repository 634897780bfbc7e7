//! # 画像アップロード API ハンドラ
//!
//! - `POST /api/upload/image` - multipart の `file` をストレージに保存し、公開 URL を返す
//!
//! 保存先パスは `{user_id}/{UUID v4}{拡張子}`。元のファイル名は拡張子以外を捨てる。

use std::sync::Arc;

use axum::{
   body::Bytes,
   extract::{
      Multipart,
      State,
      multipart::{Field, MultipartRejection},
   },
   response::Response,
};
use checkin_infra::BaasClient;
use checkin_shared::{ApiResponse, ErrorResponse};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ok_data, require};
use crate::error::{ApiError, log_and_convert_store_error};

/// 拡張子として受け入れる最大長（ドットを除く）
const MAX_EXTENSION_LEN: usize = 10;

/// 画像アップロード API の共有状態
pub struct UploadState {
   pub baas:   BaasClient,
   pub bucket: String,
}

/// アップロードフォーム（OpenAPI ドキュメント用）
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadImageForm {
   #[schema(value_type = String, format = Binary)]
   pub file:    Vec<u8>,
   pub user_id: String,
}

/// アップロード結果
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedImageData {
   pub url:    String,
   pub path:   String,
   pub bucket: String,
}

/// 受信したファイルパート
struct FilePart {
   file_name:    String,
   content_type: Option<String>,
   content:      Bytes,
}

/// POST /api/upload/image
#[utoipa::path(
   post,
   path = "/api/upload/image",
   tag = "upload",
   request_body(content = UploadImageForm, content_type = "multipart/form-data"),
   responses(
      (status = 200, description = "アップロード完了", body = ApiResponse<UploadedImageData>),
      (status = 400, description = "file / user_id の欠落", body = ErrorResponse),
      (status = 500, description = "ストレージエラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_image(
   State(state): State<Arc<UploadState>>,
   multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
   let mut multipart = multipart?;

   let mut file = None;
   let mut user_id = None;
   while let Some(field) = multipart.next_field().await? {
      let name = field.name().map(str::to_string);
      match name.as_deref() {
         Some("file") => file = Some(read_file(field).await?),
         Some("user_id") => user_id = Some(field.text().await?),
         _ => {}
      }
   }

   let file = file.ok_or_else(|| ApiError::missing("file"))?;
   if file.file_name.trim().is_empty() {
      return Err(ApiError::validation("ファイルが選択されていません"));
   }
   let user_id = require("user_id", user_id)?;
   validate_user_id(&user_id)?;

   let path = format!("{user_id}/{}{}", Uuid::new_v4(), sanitize_extension(&file.file_name));
   let bucket = state.baas.storage().from(state.bucket.as_str());
   let uploaded = bucket
      .upload(&path, file.content, file.content_type.as_deref())
      .await
      .map_err(|e| log_and_convert_store_error("画像アップロード", e))?;

   tracing::info!(path = %uploaded.path, bucket = %state.bucket, "画像をアップロードしました");
   Ok(ok_data(UploadedImageData {
      url:    bucket.public_url(&uploaded.path),
      path:   uploaded.path,
      bucket: state.bucket.clone(),
   }))
}

async fn read_file(field: Field<'_>) -> Result<FilePart, ApiError> {
   let file_name = field.file_name().unwrap_or_default().to_string();
   let content_type = field.content_type().map(str::to_string);
   let content = field.bytes().await?;
   Ok(FilePart {
      file_name,
      content_type,
      content,
   })
}

/// `user_id` をパスの 1 セグメントとして使えるか検証する
fn validate_user_id(user_id: &str) -> Result<(), ApiError> {
   if user_id.contains('/') || user_id.contains('\\') || user_id.contains("..") {
      return Err(ApiError::validation("user_id に使用できない文字が含まれています"));
   }
   Ok(())
}

/// クライアントのファイル名から安全な拡張子（`.png` など）を取り出す
///
/// 英数字のみ・長さ上限内の拡張子だけを小文字で残し、それ以外は空文字列。
fn sanitize_extension(file_name: &str) -> String {
   let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
   match base.rsplit_once('.') {
      Some((stem, ext))
         if !stem.is_empty()
            && !ext.is_empty()
            && ext.len() <= MAX_EXTENSION_LEN
            && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
      {
         format!(".{}", ext.to_ascii_lowercase())
      }
      _ => String::new(),
   }
}
