//! # BFF アプリケーション構築
//!
//! State の初期化とルーター構築を担当する。
//! `main.rs` は設定読み込みとサーバー起動に集中し、テストは同じルーターを
//! インメモリの BaaS に接続して組み立てる。

use std::sync::Arc;

use axum::{
   Router,
   extract::DefaultBodyLimit,
   middleware::from_fn,
   routing::{get, post, put},
};
use checkin_infra::BaasClient;
use checkin_shared::{
   canonical_log::CanonicalLogLineLayer,
   observability::{MakeRequestUuidV7, make_request_span},
};
use tower_http::{
   cors::CorsLayer,
   request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
   trace::TraceLayer,
};

use crate::{
   client::Geocoder,
   clock::Clock,
   config::BffConfig,
   handler::{
      CheckinState,
      ReadinessState,
      RecordState,
      UploadState,
      create_checkin,
      create_journal,
      create_secret,
      create_task,
      delete_checkin,
      delete_journal,
      delete_secret,
      delete_task,
      get_badge,
      get_group,
      get_task_stats,
      get_user,
      get_user_stats,
      health_check,
      list_badges,
      list_checkins,
      list_friends,
      list_groups,
      list_journals,
      list_plaza_posts,
      list_secrets,
      list_tasks,
      readiness_check,
      unlock_badge,
      update_checkin,
      update_journal,
      update_secret,
      update_task,
      update_user,
      upload_image,
   },
   middleware::{no_cache, request_id::store_request_id},
};

/// ルーターを構築する
///
/// すべての State は同じ [`BaasClient`] を共有する。
pub fn build_app(
   config: &BffConfig,
   baas: BaasClient,
   geocoder: Arc<dyn Geocoder>,
   clock: Arc<dyn Clock>,
) -> Router {
   let readiness_state = Arc::new(ReadinessState {
      baas:   baas.clone(),
      bucket: config.storage_bucket.clone(),
   });

   let checkin_state = Arc::new(CheckinState {
      baas: baas.clone(),
      clock: clock.clone(),
      geocoder,
   });

   let upload_state = Arc::new(UploadState {
      baas:   baas.clone(),
      bucket: config.storage_bucket.clone(),
   });

   // チェックイン・アップロード以外のレコード系ハンドラは同じ State を共有する
   let record_state = Arc::new(RecordState { baas, clock });

   let checkin_routes = Router::new()
      .route("/api/checkins", get(list_checkins).post(create_checkin))
      .route("/api/checkins/{id}", put(update_checkin).delete(delete_checkin))
      .with_state(checkin_state);

   let record_routes = Router::new()
      .route("/api/users/{id}", get(get_user).put(update_user))
      .route("/api/users/{id}/stats", get(get_user_stats))
      .route("/api/badges", get(list_badges))
      .route("/api/badges/unlock", post(unlock_badge))
      .route("/api/badges/{id}", get(get_badge))
      .route("/api/friends", get(list_friends))
      .route("/api/groups", get(list_groups))
      .route("/api/groups/{id}", get(get_group))
      .route("/api/plaza", get(list_plaza_posts))
      .route("/api/tasks", get(list_tasks).post(create_task))
      .route("/api/tasks/stats", get(get_task_stats))
      .route("/api/tasks/{id}", put(update_task).delete(delete_task))
      .route("/api/journals", get(list_journals).post(create_journal))
      .route("/api/journals/{id}", put(update_journal).delete(delete_journal))
      .route("/api/secrets", get(list_secrets).post(create_secret))
      .route("/api/secrets/{id}", put(update_secret).delete(delete_secret))
      .with_state(record_state);

   let upload_routes = Router::new()
      .route("/api/upload/image", post(upload_image))
      .layer(DefaultBodyLimit::max(config.upload_max_bytes))
      .with_state(upload_state);

   // レイヤー順序: 下に書いたものが外側
   // 1. SetRequestIdLayer（最外）: UUID v7 を生成（またはクライアント提供値を使用）
   // 2. TraceLayer: request_id を含むスパンを作成
   // 3. CanonicalLogLineLayer: リクエスト完了時に 1 行サマリログを出力（スパン内）
   // 4. PropagateRequestIdLayer: レスポンスヘッダーに X-Request-Id をコピー
   // 5. store_request_id: task-local に保存し、BaaS へのリクエストに伝播する
   Router::new()
      .route("/health", get(health_check))
      .merge(
         Router::new()
            .route("/health/ready", get(readiness_check))
            .with_state(readiness_state),
      )
      .merge(checkin_routes)
      .merge(record_routes)
      .merge(upload_routes)
      .layer(CorsLayer::permissive())
      .layer(from_fn(no_cache))
      .layer(from_fn(store_request_id))
      .layer(PropagateRequestIdLayer::x_request_id())
      .layer(CanonicalLogLineLayer)
      .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
      .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}
