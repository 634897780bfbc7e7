//! # Checkin BFF ライブラリ
//!
//! チェックインアプリのフロントエンド専用 API サーバーのコアモジュール。
//! 永続化はすべて BaaS（PostgREST 互換のテーブル API とオブジェクトストレージ）に委譲する。
//!
//! ## モジュール構成
//!
//! - `app_builder`: State の初期化とルーター構築
//! - `client`: 外部 API クライアント（逆ジオコーディング）
//! - `clock`: タイムスタンプの時刻源
//! - `config`: 環境変数からの設定読み込み
//! - `error`: ハンドラ共通のエラー型
//! - `handler`: HTTP ハンドラ
//! - `middleware`: ミドルウェア（キャッシュ制御、Request ID 伝播）
//! - `openapi`: OpenAPI 仕様定義

pub mod app_builder;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod openapi;
