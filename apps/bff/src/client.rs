//! # 外部 API クライアント
//!
//! BaaS 以外の外部サービスとの通信を担当する。BaaS クライアントは
//! `checkin-infra` が提供する。

pub mod geocoding;

pub use geocoding::{
   Geocoder,
   Location,
   MapboxGeocoder,
   NoopGeocoder,
   NominatimGeocoder,
   clamp_location,
   geocoder_from_config,
};
