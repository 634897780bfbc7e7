//! # 友達 API ハンドラ
//!
//! - `GET /api/friends?user_id=` - ユーザーの友達一覧

use std::sync::Arc;

use axum::{
   extract::{Query, State, rejection::QueryRejection},
   response::Response,
};
use checkin_infra::tables;
use checkin_shared::ErrorResponse;

use super::{RecordListResponse, RecordState, UserIdQuery, ok_data, require};
use crate::error::{ApiError, log_and_convert_store_error};

/// GET /api/friends
#[utoipa::path(
   get,
   path = "/api/friends",
   tag = "friends",
   params(UserIdQuery),
   responses(
      (status = 200, description = "友達一覧", body = RecordListResponse),
      (status = 400, description = "user_id が未指定", body = ErrorResponse),
      (status = 500, description = "BaaS エラー", body = ErrorResponse)
   )
)]
#[tracing::instrument(skip_all)]
pub async fn list_friends(
   State(state): State<Arc<RecordState>>,
   query: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
   let Query(query) = query?;
   let user_id = require("user_id", query.user_id)?;

   let response = state
      .baas
      .from(tables::FRIENDS)
      .select("*")
      .eq("user_id", user_id)
      .execute()
      .await
      .map_err(|e| log_and_convert_store_error("友達一覧取得", e))?;

   Ok(ok_data(response.data))
}

#[cfg(test)]
mod tests {
   use axum::http::StatusCode;
   use checkin_infra::mock::{InMemoryBaas, MOCK_BASE_URL};
   use pretty_assertions::assert_eq;
   use serde_json::json;

   use super::{super::test_utils::*, *};

   #[tokio::test]
   async fn test_list_friends_user_idで絞り込む() {
      // Given
      let baas = InMemoryBaas::new();
      baas.seed(
         tables::FRIENDS,
         vec![
            json!({"id": "f1", "user_id": "u1", "friend_id": "u2"}),
            json!({"id": "f2", "user_id": "u3", "friend_id": "u1"}),
         ],
      );
      let sut = create_test_app(&baas);

      // When
      let (status, body) = send(sut, get("/api/friends?user_id=u1")).await;

      // Then
      assert_eq!(status, StatusCode::OK);
      assert_eq!(body["data"], json!([{"id": "f1", "user_id": "u1", "friend_id": "u2"}]));
      let requests = baas.requests();
      assert_eq!(requests.len(), 1);
      assert_eq!(
         requests[0].url,
         format!("{MOCK_BASE_URL}/rest/v1/friends?select=%2A&user_id=eq.u1")
      );
   }

   #[tokio::test]
   async fn test_list_friends_空のuser_idは400() {
      let baas = InMemoryBaas::new();
      let sut = create_test_app(&baas);

      let (status, _) = send(sut, get("/api/friends?user_id=")).await;

      assert_eq!(status, StatusCode::BAD_REQUEST);
      assert_eq!(baas.request_count(), 0);
   }
}
