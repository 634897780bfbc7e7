//! # テーブル名定数
//!
//! BaaS 側のスキーマで定義されたテーブル・ビュー名。

pub const USERS: &str = "users";
pub const CHECKINS: &str = "checkins";
pub const BADGES: &str = "badges";
pub const USER_BADGES: &str = "user_badges";
pub const FRIENDS: &str = "friends";
pub const GROUPS: &str = "groups";
pub const PLAZA_POSTS: &str = "plaza_posts";
pub const TASKS: &str = "tasks";
pub const JOURNALS: &str = "journals";
pub const SECRETS: &str = "secrets";

/// ユーザー統計ビュー（読み取り専用）
pub const USER_STATS: &str = "user_stats";
/// タスク統計ビュー（読み取り専用）
pub const USER_TASK_STATS: &str = "user_task_stats";
