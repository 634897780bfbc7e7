//! # Checkin 共有ユーティリティ
//!
//! このクレートは、Checkin バックエンド全体で使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - BFF と BaaS クライアント（infra）の両方から依存される
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - axum 等の Web フレームワークには依存しない（`IntoResponse` 変換は BFF の責務）

pub mod api_response;
#[cfg(feature = "observability")]
pub mod canonical_log;
pub mod error_response;
pub mod health;
pub mod observability;
pub mod paginated_response;

pub use api_response::{ApiResponse, MessageResponse};
pub use error_response::ErrorResponse;
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus, StorageChecks};
pub use paginated_response::PaginatedResponse;
