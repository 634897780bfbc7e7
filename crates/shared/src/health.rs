//! # ヘルスチェック共通型
//!
//! `/health`（Liveness）と `/health/ready`（Readiness）のレスポンス型。
//!
//! Readiness は BaaS のストレージ API を 1 回呼び出した結果から次の 2 項目を判定する:
//!
//! | キー | 意味 |
//! |------|------|
//! | `baas` | BaaS に到達でき、2xx が返った |
//! | `storage_bucket` | 画像バケットがバケット一覧に含まれていた |

use serde::{Deserialize, Serialize};

/// Liveness レスポンス（プロセスが応答できれば常に `"healthy"`）
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status:  String,
    /// BFF のバージョン
    pub version: String,
}

impl HealthResponse {
    pub fn healthy(version: impl Into<String>) -> Self {
        Self {
            status:  "healthy".to_string(),
            version: version.into(),
        }
    }
}

/// 個別チェックの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum CheckStatus {
    Ok,
    Error,
}

impl From<bool> for CheckStatus {
    fn from(passed: bool) -> Self {
        if passed { Self::Ok } else { Self::Error }
    }
}

/// Readiness 全体の判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ReadinessStatus {
    Ready,
    NotReady,
}

/// ストレージ依存のチェック結果
///
/// BaaS に到達できなければバケットの存在も確認できないため、
/// `baas` が `Error` のとき `storage_bucket` も `Error` になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StorageChecks {
    pub baas:           CheckStatus,
    pub storage_bucket: CheckStatus,
}

impl StorageChecks {
    /// バケット一覧を取得できた場合（`bucket_found` はバケットの有無）
    pub fn reachable(bucket_found: bool) -> Self {
        Self {
            baas:           CheckStatus::Ok,
            storage_bucket: bucket_found.into(),
        }
    }

    /// BaaS に到達できなかった、またはタイムアウトした場合
    pub fn unreachable() -> Self {
        Self {
            baas:           CheckStatus::Error,
            storage_bucket: CheckStatus::Error,
        }
    }

    fn all_ok(&self) -> bool {
        self.baas == CheckStatus::Ok && self.storage_bucket == CheckStatus::Ok
    }
}

/// Readiness レスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReadinessResponse {
    pub status: ReadinessStatus,
    pub checks: StorageChecks,
}

impl ReadinessResponse {
    pub fn from_checks(checks: StorageChecks) -> Self {
        let status = if checks.all_ok() {
            ReadinessStatus::Ready
        } else {
            ReadinessStatus::NotReady
        };
        Self { status, checks }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ReadinessStatus::Ready
    }
}
