//! # Checkin BFF (Backend for Frontend) サーバー
//!
//! チェックインアプリのフロントエンド専用 API サーバー。
//!
//! ## 役割
//!
//! - 必須項目の検証
//! - BaaS（テーブル API / オブジェクトストレージ）への 1 回の操作への変換
//! - BaaS の応答を `{ data }` 形式の JSON とステータスコードに整形
//!
//! ## アーキテクチャ
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Browser    │────▶│     BFF      │────▶│     BaaS     │
//! │   (SPA)      │     │  port: 5000  │     │  (Supabase)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                             │
//!                             ▼
//!                      ┌──────────────┐
//!                      │  Geocoding   │
//!                      │ (Nominatim)  │
//!                      └──────────────┘
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `BFF_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `BFF_PORT` | No | ポート番号（デフォルト: `5000`） |
//! | `SUPABASE_URL` | **Yes** | BaaS のベース URL |
//! | `SUPABASE_SERVICE_ROLE` / `SUPABASE_KEY` / `SUPABASE_ANON_KEY` | **いずれか** | API キー |
//! | `STORAGE_BUCKET` | No | 画像バケット（デフォルト: `images`） |
//! | `UPLOAD_MAX_BYTES` | No | アップロード上限（デフォルト: 10 MiB） |
//! | `GEOCODING_PROVIDER` | No | `nominatim` / `mapbox` / `none` |
//! | `MAPBOX_TOKEN` | mapbox 時 | Mapbox のアクセストークン |
//! | `LOG_FORMAT` | No | `json` / `pretty` |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（.env ファイルを使用）
//! cargo run -p checkin-bff
//!
//! # 本番環境（環境変数を直接指定）
//! SUPABASE_URL=https://... SUPABASE_KEY=... LOG_FORMAT=json cargo run -p checkin-bff --release
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use checkin_bff::{
   app_builder::build_app,
   client::geocoder_from_config,
   clock::SystemClock,
   config::BffConfig,
   middleware::request_id::inject_request_id,
};
use checkin_infra::{BaasClient, transport::ReqwestTransport};
use checkin_shared::observability::TracingConfig;
use tokio::net::TcpListener;

/// BFF サーバーのエントリーポイント
///
/// 以下の順序で初期化を行う:
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. トレーシングの初期化
/// 3. アプリケーション設定の読み込み
/// 4. ルーターの構築
/// 5. HTTP サーバーの起動
#[tokio::main]
async fn main() -> anyhow::Result<()> {
   // 本番環境では .env ファイルは使用せず、環境変数を直接設定する
   dotenvy::dotenv().ok();

   let tracing_config = TracingConfig::from_env("bff");
   checkin_shared::observability::init_tracing(tracing_config);
   let _tracing_guard = tracing::info_span!("app", service = "bff").entered();

   let config = BffConfig::from_env().context("設定の読み込みに失敗しました")?;

   tracing::info!("BFF サーバーを起動します: {}:{}", config.host, config.port);
   tracing::info!(
      baas = %config.supabase_url,
      bucket = %config.storage_bucket,
      geocoding = config.geocoding.name(),
      "依存サービスの設定"
   );

   // BaaS への全リクエストに受信リクエストの X-Request-Id を付与する
   let transport = ReqwestTransport::new().with_decorator(inject_request_id);
   let baas = BaasClient::with_transport(
      &config.supabase_url,
      config.supabase_key.clone(),
      Arc::new(transport),
   );
   let geocoder =
      geocoder_from_config(&config.geocoding).context("ジオコーダーの初期化に失敗しました")?;

   let app = build_app(&config, baas, geocoder, Arc::new(SystemClock));

   let addr: SocketAddr = format!("{}:{}", config.host, config.port)
      .parse()
      .with_context(|| format!("バインドアドレスが不正です: {}:{}", config.host, config.port))?;
   let listener = TcpListener::bind(addr)
      .await
      .with_context(|| format!("{addr} へのバインドに失敗しました"))?;
   tracing::info!("BFF サーバーが起動しました: {}", addr);

   axum::serve(listener, app).await?;

   Ok(())
}
