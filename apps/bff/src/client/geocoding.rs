//! # 逆ジオコーディング
//!
//! チェックインの位置情報（緯度・経度）から住所文字列を得る。
//!
//! - [`NominatimGeocoder`]: OpenStreetMap Nominatim の reverse API
//! - [`MapboxGeocoder`]: Mapbox Geocoding API（アクセストークン必須）
//! - [`NoopGeocoder`]: 何もしない（`GEOCODING_PROVIDER=none`）
//!
//! 住所の取得は補助情報にすぎないため、失敗はすべて `None` として扱い
//! チェックイン作成を失敗させない。各リクエストは 5 秒でタイムアウトする。

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::{ConfigError, GeocodingProvider};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("checkin-bff/", env!("CARGO_PKG_VERSION"));
const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const MAPBOX_BASE_URL: &str = "https://api.mapbox.com";

/// 正規化済みの位置情報
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
   pub latitude:  f64,
   pub longitude: f64,
   pub accuracy:  Option<f64>,
   pub address:   Option<String>,
}

/// 住所を逆引きするインターフェース
#[async_trait]
pub trait Geocoder: Send + Sync {
   /// 住所文字列を返す。取得できなければ `None`
   async fn reverse(&self, latitude: f64, longitude: f64) -> Option<String>;
}

/// クライアント入力の位置情報を検証・正規化する
///
/// - `latitude` / `longitude` は数値または数値文字列。範囲外（|緯度| > 90, |経度| > 180）や
///   数値として解釈できない場合は `None`
/// - 座標は小数点以下 6 桁に丸める
/// - `accuracy` は `[0, 10000]` の範囲外なら捨てる
/// - `address` は文字列のときだけ残す
pub fn clamp_location(value: &Value) -> Option<Location> {
   let latitude = as_f64(value.get("latitude")?)?;
   let longitude = as_f64(value.get("longitude")?)?;
   if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
      return None;
   }

   let accuracy = match value.get("accuracy") {
      None | Some(Value::Null) => None,
      Some(raw) => Some(as_f64(raw)?),
   }
   .filter(|acc| (0.0..=10000.0).contains(acc));

   let address = value
      .get("address")
      .and_then(Value::as_str)
      .map(str::to_string);

   Some(Location {
      latitude: round6(latitude),
      longitude: round6(longitude),
      accuracy,
      address,
   })
}

fn as_f64(value: &Value) -> Option<f64> {
   let n = match value {
      Value::Number(n) => n.as_f64()?,
      Value::String(s) => s.trim().parse().ok()?,
      _ => return None,
   };
   n.is_finite().then_some(n)
}

fn round6(x: f64) -> f64 {
   (x * 1_000_000.0).round() / 1_000_000.0
}

/// 設定に応じた Geocoder を生成する
///
/// HTTP クライアントを構築できない場合は起動を中止する。
pub fn geocoder_from_config(provider: &GeocodingProvider) -> Result<Arc<dyn Geocoder>, ConfigError> {
   let geocoder: Arc<dyn Geocoder> = match provider {
      GeocodingProvider::Nominatim => Arc::new(NominatimGeocoder::new()?),
      GeocodingProvider::Mapbox { token } => Arc::new(MapboxGeocoder::new(token.clone())?),
      GeocodingProvider::Disabled => Arc::new(NoopGeocoder),
   };
   Ok(geocoder)
}

fn http_client() -> Result<reqwest::Client, ConfigError> {
   reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .user_agent(USER_AGENT)
      .build()
      .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

/// 取得結果をログ付きで `Option` にまとめる
async fn fetch_json(client: &reqwest::Client, url: &str, provider: &'static str) -> Option<Value> {
   let result: Result<Value, reqwest::Error> = async {
      client
         .get(url)
         .send()
         .await?
         .error_for_status()?
         .json::<Value>()
         .await
   }
   .await;

   match result {
      Ok(body) => Some(body),
      Err(e) => {
         tracing::warn!(
            error.category = "external_service",
            error.kind = "geocoding",
            provider,
            "逆ジオコーディングに失敗しました: {}",
            e
         );
         None
      }
   }
}

fn non_empty(s: Option<&str>) -> Option<String> {
   s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// OpenStreetMap Nominatim による逆ジオコーディング
pub struct NominatimGeocoder {
   client:   reqwest::Client,
   base_url: String,
}

impl NominatimGeocoder {
   pub fn new() -> Result<Self, ConfigError> {
      Self::with_base_url(NOMINATIM_BASE_URL)
   }

   pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
      Ok(Self {
         client:   http_client()?,
         base_url: base_url.trim_end_matches('/').to_string(),
      })
   }

   fn url(&self, latitude: f64, longitude: f64) -> String {
      format!(
         "{}/reverse?format=json&lat={latitude}&lon={longitude}&zoom=16&addressdetails=1",
         self.base_url
      )
   }

   fn parse(body: &Value) -> Option<String> {
      non_empty(body.get("display_name").and_then(Value::as_str))
   }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
   async fn reverse(&self, latitude: f64, longitude: f64) -> Option<String> {
      let body = fetch_json(&self.client, &self.url(latitude, longitude), "nominatim").await?;
      Self::parse(&body)
   }
}

/// Mapbox Geocoding API による逆ジオコーディング
pub struct MapboxGeocoder {
   client:   reqwest::Client,
   base_url: String,
   token:    String,
}

impl MapboxGeocoder {
   pub fn new(token: String) -> Result<Self, ConfigError> {
      Self::with_base_url(MAPBOX_BASE_URL, token)
   }

   pub fn with_base_url(base_url: &str, token: String) -> Result<Self, ConfigError> {
      Ok(Self {
         client: http_client()?,
         base_url: base_url.trim_end_matches('/').to_string(),
         token,
      })
   }

   fn url(&self, latitude: f64, longitude: f64) -> String {
      let coords = urlencoding::encode(&format!("{longitude},{latitude}")).into_owned();
      format!(
         "{}/geocoding/v5/mapbox.places/{coords}.json?access_token={}&limit=1&language=zh",
         self.base_url,
         urlencoding::encode(&self.token)
      )
   }

   fn parse(body: &Value) -> Option<String> {
      let feature = body.get("features")?.as_array()?.first()?;
      non_empty(feature.get("place_name").and_then(Value::as_str))
   }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
   async fn reverse(&self, latitude: f64, longitude: f64) -> Option<String> {
      let body = fetch_json(&self.client, &self.url(latitude, longitude), "mapbox").await?;
      Self::parse(&body)
   }
}

/// 逆ジオコーディングを行わない実装
pub struct NoopGeocoder;

#[async_trait]
impl Geocoder for NoopGeocoder {
   async fn reverse(&self, _latitude: f64, _longitude: f64) -> Option<String> {
      None
   }
}
