//! # 広場 API ハンドラ
//!
//! - `GET /api/plaza?page=&limit=` - 広場の投稿一覧（新しい順、ページ単位）

use std::sync::Arc;

use axum::{
   Json,
   extract::{Query, State, rejection::QueryRejection},
   http::StatusCode,
   response::{IntoResponse, Response},
};
use checkin_infra::{
   query::{CountOption, Direction},
   tables,
};
use checkin_shared::{ErrorResponse, PaginatedResponse};
use serde::Deserialize;
use utoipa::IntoParams;

use super::{RecordPageResponse, RecordState, page_params};
use crate::error::{ApiError, log_and_convert_store_error};

const DEFAULT_LIMIT: u32 = 20;

/// 広場一覧のクエリ
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PlazaQuery {
   /// ページ番号（1 始まり、デフォルト 1）
   pub page:  Option<u32>,
   /// 1 ページあたりの件数（デフォルト 20、上限 100）
   pub limit: Option<u32>,
}

/// GET /api/plaza
#[utoipa::path(
   get,
   path = "/api/plaza",
   tag = "plaza",
   params(PlazaQuery),
   responses(
      (status = 200, description = "投稿一覧", body = RecordPageResponse),
      (status = 400, description = "ページ指定が不正", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn list_plaza_posts(
   State(state): State<Arc<RecordState>>,
   query: Result<Query<PlazaQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
   let Query(query) = query?;
   let (page, limit) = page_params(query.page, query.limit, DEFAULT_LIMIT)?;

   let response = state
      .baas
      .from(tables::PLAZA_POSTS)
      .select("*")
      .order("created_at", Direction::Desc)
      .paginate(page, limit)
      .count(CountOption::Exact)
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("広場一覧取得", e))?;

   let body = PaginatedResponse {
      data: response.data,
      total: response.count,
      page,
      page_size: limit,
   };
   Ok((StatusCode::OK, Json(body)).into_response())
}
