//! # グループ API ハンドラ
//!
//! - `GET /api/groups` - グループ一覧
//! - `GET /api/groups/{id}` - グループ詳細

use std::sync::Arc;

use axum::{
   extract::{Path, State},
   response::Response,
};
use checkin_infra::tables;
use checkin_shared::ErrorResponse;

use super::{RecordListResponse, RecordResponse, RecordState, ok_data, single_row};
use crate::error::{ApiError, log_and_convert_store_error};

/// GET /api/groups
#[utoipa::path(
   get,
   path = "/api/groups",
   tag = "groups",
   responses(
      (status = 200, description = "グループ一覧", body = RecordListResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn list_groups(State(state): State<Arc<RecordState>>) -> Result<Response, ApiError> {
   let response = state
      .baas
      .from(tables::GROUPS)
      .select("*")
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("グループ一覧取得", e))?;

   Ok(ok_data(response.data))
}

/// GET /api/groups/{id}
#[utoipa::path(
   get,
   path = "/api/groups/{id}",
   tag = "groups",
   params(("id" = String, Path, description = "グループ ID")),
   responses(
      (status = 200, description = "グループ詳細", body = RecordResponse),
      (status = 404, description = "グループが存在しない", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_group(
   State(state): State<Arc<RecordState>>,
   Path(id): Path<String>,
) -> Result<Response, ApiError> {
   let response = state
      .baas
      .from(tables::GROUPS)
      .select("*")
      .eq("id", id.as_str())
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("グループ取得", e))?;

   Ok(ok_data(single_row(response, "group", &id)?))
}

#[cfg(test)]
mod tests {
   use axum::http::StatusCode;
   use checkin_infra::mock::InMemoryBaas;
   use pretty_assertions::assert_eq;
   use serde_json::json;

   use super::{super::test_utils::*, *};

   #[tokio::test]
   async fn test_list_groups_全件を返す() {
      let baas = InMemoryBaas::new();
      baas.seed(
         tables::GROUPS,
         vec![json!({"id": "g1", "name": "朝活部"}), json!({"id": "g2", "name": "読書会"})],
      );
      let sut = create_test_app(&baas);

      let (status, body) = send(sut, get("/api/groups")).await;

      assert_eq!(status, StatusCode::OK);
      assert_eq!(body["data"].as_array().unwrap().len(), 2);
   }

   #[tokio::test]
   async fn test_get_group_詳細を返す() {
      let baas = InMemoryBaas::new();
      baas.seed(tables::GROUPS, vec![json!({"id": "g1", "name": "朝活部"})]);
      let sut = create_test_app(&baas);

      let (status, body) = send(sut, get("/api/groups/g1")).await;

      assert_eq!(status, StatusCode::OK);
      assert_eq!(body["data"]["name"], "朝活部");
   }

   #[tokio::test]
   async fn test_get_group_存在しないグループは404() {
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);

      let (status, body) = send(sut, get("/api/groups/g9")).await;

      assert_eq!(status, StatusCode::NOT_FOUND);
      assert_eq!(body["type"], "https://checkin.example.com/errors/group-not-found");
   }
}
