//! # BFF 設定
//!
//! 環境変数から BFF サーバーの設定を読み込む。
//!
//! 読み込みは [`BffConfig::from_lookup`] に集約しており、テストでは
//! 環境変数を書き換えずにクロージャで値を与える。

use std::env;

use thiserror::Error;

/// アップロードボディ上限のデフォルト（10 MiB）
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

/// API キーとして参照する環境変数（先に見つかった空でない値を使う）
const API_KEY_VARS: [&str; 3] = ["SUPABASE_SERVICE_ROLE", "SUPABASE_KEY", "SUPABASE_ANON_KEY"];

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
   #[error("{0} が設定されていません")]
   Missing(&'static str),

   #[error("{name} の値 {value:?} が不正です: {reason}")]
   Invalid {
      name:   &'static str,
      value:  String,
      reason: &'static str,
   },

   #[error("HTTP クライアントを初期化できません: {0}")]
   HttpClient(String),
}

/// 逆ジオコーディングの提供元
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodingProvider {
   Nominatim,
   Mapbox { token: String },
   Disabled,
}

impl GeocodingProvider {
   /// ログ出力用の名前（トークンは含めない）
   pub fn name(&self) -> &'static str {
      match self {
         Self::Nominatim => "nominatim",
         Self::Mapbox { .. } => "mapbox",
         Self::Disabled => "none",
      }
   }
}

/// BFF サーバーの設定
#[derive(Debug, Clone)]
pub struct BffConfig {
   /// バインドアドレス
   pub host:             String,
   /// ポート番号
   pub port:             u16,
   /// BaaS のベース URL
   pub supabase_url:     String,
   /// BaaS の API キー
   pub supabase_key:     String,
   /// 画像アップロード先バケット
   pub storage_bucket:   String,
   /// multipart ボディの上限バイト数
   pub upload_max_bytes: usize,
   pub geocoding:        GeocodingProvider,
}

impl BffConfig {
   /// 環境変数から設定を読み込む
   pub fn from_env() -> Result<Self, ConfigError> {
      Self::from_lookup(|name| env::var(name).ok())
   }

   /// 任意の参照関数から設定を読み込む
   ///
   /// 空文字列（空白のみを含む）は未設定として扱う。
   pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
      let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

      let port = match get("BFF_PORT") {
         Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name: "BFF_PORT",
            value,
            reason: "有効なポート番号である必要があります",
         })?,
         None => 5000,
      };

      let supabase_url = get("SUPABASE_URL")
         .map(|url| url.trim().trim_end_matches('/').to_string())
         .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
      if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
         return Err(ConfigError::Invalid {
            name:   "SUPABASE_URL",
            value:  supabase_url,
            reason: "http:// または https:// で始まる必要があります",
         });
      }

      let supabase_key = API_KEY_VARS
         .iter()
         .find_map(|&name| get(name))
         .ok_or(ConfigError::Missing(
            "SUPABASE_SERVICE_ROLE / SUPABASE_KEY / SUPABASE_ANON_KEY",
         ))?;

      let upload_max_bytes = match get("UPLOAD_MAX_BYTES") {
         Some(value) => match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
               return Err(ConfigError::Invalid {
                  name: "UPLOAD_MAX_BYTES",
                  value,
                  reason: "1 以上の整数である必要があります",
               });
            }
         },
         None => DEFAULT_UPLOAD_MAX_BYTES,
      };

      let geocoding = parse_geocoding_provider(
         get("GEOCODING_PROVIDER").as_deref(),
         get("MAPBOX_TOKEN"),
      )?;

      Ok(Self {
         host: get("BFF_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
         port,
         supabase_url,
         supabase_key,
         storage_bucket: get("STORAGE_BUCKET").unwrap_or_else(|| "images".to_string()),
         upload_max_bytes,
         geocoding,
      })
   }
}

fn parse_geocoding_provider(
   provider: Option<&str>,
   mapbox_token: Option<String>,
) -> Result<GeocodingProvider, ConfigError> {
   let Some(provider) = provider else {
      return Ok(GeocodingProvider::Nominatim);
   };
   match provider.trim().to_ascii_lowercase().as_str() {
      "nominatim" => Ok(GeocodingProvider::Nominatim),
      "mapbox" => mapbox_token
         .map(|token| GeocodingProvider::Mapbox { token })
         .ok_or(ConfigError::Missing("MAPBOX_TOKEN")),
      "none" => Ok(GeocodingProvider::Disabled),
      _ => Err(ConfigError::Invalid {
         name:   "GEOCODING_PROVIDER",
         value:  provider.to_string(),
         reason: "nominatim / mapbox / none のいずれかである必要があります",
      }),
   }
}
