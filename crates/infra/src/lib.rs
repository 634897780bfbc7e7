//! # Checkin インフラ層
//!
//! BaaS（Supabase 互換の PostgREST テーブル API + オブジェクトストレージ）との
//! 通信を担当する。
//!
//! ## 設計方針
//!
//! - 公式 SDK を使わず、必要最小限の REST クライアントを自前で持つ
//! - HTTP 送受信は [`transport::HttpTransport`] トレイトに閉じ込め、テストでは
//!   インメモリ実装（`test-utils` feature の [`mock`]）に差し替える
//! - クエリの組み立て誤りは `execute()` 時に検出し、ネットワーク呼び出し前に返す
//!
//! ## モジュール構成
//!
//! - [`client`] - BaaS クライアントハンドル（ベース URL + API キー + トランスポート）
//! - [`query`] - テーブル操作のクエリビルダー
//! - [`storage`] - ストレージバケットクライアント
//! - [`transport`] - HTTP トランスポート抽象と reqwest 実装
//! - [`tables`] - テーブル名定数
//! - [`error`] - インフラ層エラー定義
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use checkin_infra::{BaasClient, query::Direction, tables};
//!
//! let client = BaasClient::new("https://xyz.supabase.co", "service-role-key");
//! let response = client
//!     .from(tables::CHECKINS)
//!     .select("*")
//!     .eq("user_id", "u1")
//!     .order("created_at", Direction::Desc)
//!     .execute()
//!     .await?;
//! ```

pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod query;
pub mod storage;
pub mod tables;
pub mod transport;

pub use client::BaasClient;
pub use error::{InfraError, InfraErrorKind};
pub use query::StoreResponse;
