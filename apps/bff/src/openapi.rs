//! # OpenAPI 仕様定義
//!
//! utoipa を使用して BFF の OpenAPI 仕様を Rust の型から自動生成する。
//! `ApiDoc::openapi()` で OpenAPI ドキュメントを取得できる。

use utoipa::OpenApi;

use crate::handler::{
   badge,
   checkin,
   friend,
   group,
   health,
   journal,
   plaza,
   secret,
   task,
   upload,
   user,
};

#[derive(OpenApi)]
#[openapi(
   info(
      title = "Checkin API",
      version = "0.1.0",
      description = "チェックインアプリの BFF API"
   ),
   paths(
      // health
      health::health_check,
      health::readiness_check,
      // checkins
      checkin::list_checkins,
      checkin::create_checkin,
      checkin::update_checkin,
      checkin::delete_checkin,
      // users
      user::get_user,
      user::update_user,
      user::get_user_stats,
      // badges
      badge::list_badges,
      badge::get_badge,
      badge::unlock_badge,
      // friends / groups / plaza
      friend::list_friends,
      group::list_groups,
      group::get_group,
      plaza::list_plaza_posts,
      // tasks
      task::list_tasks,
      task::create_task,
      task::update_task,
      task::delete_task,
      task::get_task_stats,
      // journals
      journal::list_journals,
      journal::create_journal,
      journal::update_journal,
      journal::delete_journal,
      // secrets
      secret::list_secrets,
      secret::create_secret,
      secret::update_secret,
      secret::delete_secret,
      // upload
      upload::upload_image,
   ),
   components(schemas(
      checkin_shared::ErrorResponse,
   )),
   tags(
      (name = "health", description = "ヘルスチェック"),
      (name = "checkins", description = "チェックイン"),
      (name = "users", description = "ユーザー"),
      (name = "badges", description = "バッジ"),
      (name = "friends", description = "友達"),
      (name = "groups", description = "グループ"),
      (name = "plaza", description = "広場"),
      (name = "tasks", description = "タスク"),
      (name = "journals", description = "手帳"),
      (name = "secrets", description = "秘密の部屋"),
      (name = "upload", description = "画像アップロード"),
   )
)]
pub struct ApiDoc;
