//! # Clock（時刻プロバイダ）
//!
//! ハンドラで付与する `created_at` / `updated_at` の時刻源。
//! テストでは固定時刻を注入してレスポンスを検証する。

use chrono::{DateTime, SecondsFormat, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
   fn now(&self) -> DateTime<Utc>;

   /// BaaS に保存する形式（RFC 3339、マイクロ秒精度）の現在時刻
   fn timestamp(&self) -> String {
      self.now().to_rfc3339_opts(SecondsFormat::Micros, true)
   }
}

/// システム時刻を返す実装
pub struct SystemClock;

impl Clock for SystemClock {
   fn now(&self) -> DateTime<Utc> {
      Utc::now()
   }
}

/// 固定時刻を返すテスト用実装
pub struct FixedClock {
   now: DateTime<Utc>,
}

impl FixedClock {
   pub fn new(now: DateTime<Utc>) -> Self {
      Self { now }
   }
}

impl Clock for FixedClock {
   fn now(&self) -> DateTime<Utc> {
      self.now
   }
}

#[cfg(test)]
mod tests {
   use chrono::TimeZone;
   use pretty_assertions::assert_eq;

   use super::*;

   #[test]
   fn test_system_clock_は現在時刻を返す() {
      let before = Utc::now();
      let result = SystemClock.now();
      let after = Utc::now();

      assert!(before <= result && result <= after);
   }

   #[test]
   fn test_timestamp_はrfc3339のutc表記を返す() {
      let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 7, 30, 0).unwrap());

      assert_eq!(clock.timestamp(), "2024-05-01T07:30:00.000000Z");
   }
}
