//! # ページネーション付きレスポンス
//!
//! ページ番号ベースのページネーションに対応した API レスポンス型。

use serde::{Deserialize, Serialize};

/// ページネーション付きレスポンス
///
/// `ApiResponse<T>` が単一データ用であるのに対し、
/// `PaginatedResponse<T>` はリスト + ページ情報の形式。
///
/// ## JSON 形式
///
/// ```json
/// {
///   "data": [...],
///   "total": 42,
///   "page": 2,
///   "page_size": 10
/// }
/// ```
///
/// `total` は BaaS が件数を返さなかった場合 `null` になる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PaginatedResponse<T> {
   pub data:      Vec<T>,
   pub total:     Option<u64>,
   pub page:      u32,
   pub page_size: u32,
}
