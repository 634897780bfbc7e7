//! # インフラ層エラー定義
//!
//! BaaS との通信で発生するエラーを表現する。
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターン:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: 具体的な種別（Transport, Store, EmptyResult, InvalidQuery, Serialization）
//!
//! convenience constructor と `From` 実装は、生成時点のスパン情報を
//! [`SpanTrace`] として自動でキャプチャする。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// エラー種別に応じた処理には [`kind()`](InfraError::kind) を使用する:
///
/// ```ignore
/// match error.kind() {
///     InfraErrorKind::Store { status, message } => { /* BaaS が非 2xx を返した */ }
///     _ => { /* その他 */ }
/// }
/// ```
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// ネットワーク到達不能、タイムアウト、レスポンス読み取り失敗など
    #[error("通信エラー: {0}")]
    Transport(String),

    /// BaaS が非 2xx ステータスを返した
    ///
    /// `message` はレスポンスボディをそのまま保持する。ボディが空の場合は
    /// `status N` 形式の文字列になる。
    #[error("{message}")]
    Store {
        /// HTTP ステータスコード
        status:  u16,
        /// BaaS が返したエラー本文
        message: String,
    },

    /// 書き込みが 2xx で成功したが、作成・更新後の行が返らなかった
    #[error("BaaS が {0} の結果を返しませんでした")]
    EmptyResult(String),

    /// クエリの組み立て誤り
    ///
    /// `execute()` 時に検出され、ネットワーク呼び出しは行われない。
    #[error("不正なクエリ: {0}")]
    InvalidQuery(String),

    /// JSON の変換に失敗した
    #[error("シリアライズエラー: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl InfraError {
    /// エラー種別を取得する
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// SpanTrace を取得する
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// ログの `error.kind` フィールド用の種別名
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            InfraErrorKind::Transport(_) => "transport",
            InfraErrorKind::Store { .. } => "store",
            InfraErrorKind::EmptyResult(_) => "empty_result",
            InfraErrorKind::InvalidQuery(_) => "invalid_query",
            InfraErrorKind::Serialization(_) => "serialization",
        }
    }

    /// Store エラーの場合、HTTP ステータスを返す
    pub fn store_status(&self) -> Option<u16> {
        match &self.kind {
            InfraErrorKind::Store { status, .. } => Some(*status),
            _ => None,
        }
    }

    // ===== Convenience constructors =====

    /// 通信エラーを生成する
    pub fn transport(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Transport(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    /// BaaS の非 2xx レスポンスからエラーを生成する
    ///
    /// 空ボディ（空白のみを含む）の場合は `status N` をメッセージとする。
    pub fn store(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.trim().is_empty() {
            format!("status {status}")
        } else {
            body
        };
        Self {
            kind:       InfraErrorKind::Store { status, message },
            span_trace: SpanTrace::capture(),
        }
    }

    /// 行を返すべき操作が 0 行を返したエラーを生成する（`table` は対象テーブル名）
    pub fn empty_result(table: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::EmptyResult(table.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    /// クエリ組み立て誤りのエラーを生成する
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::InvalidQuery(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Serialization(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(source: reqwest::Error) -> Self {
        Self::transport(source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    #[test]
    fn test_storeはボディをそのままメッセージにする() {
        let err = InfraError::store(409, r#"{"message":"duplicate key"}"#);

        assert_eq!(err.to_string(), r#"{"message":"duplicate key"}"#);
        assert_eq!(err.store_status(), Some(409));
        assert_eq!(err.kind_name(), "store");
    }

    #[test]
    fn test_store_空ボディではstatus_nになる() {
        let err = InfraError::store(503, "  ");

        assert_eq!(err.to_string(), "status 503");
    }

    #[test]
    fn test_transportの表示とkind名() {
        let err = InfraError::transport("connection refused");

        assert_eq!(err.to_string(), "通信エラー: connection refused");
        assert_eq!(err.kind_name(), "transport");
        assert_eq!(err.store_status(), None);
    }

    #[test]
    fn test_empty_resultはテーブル名を含む() {
        let err = InfraError::empty_result("checkins");

        assert_eq!(err.to_string(), "BaaS が checkins の結果を返しませんでした");
        assert_eq!(err.kind_name(), "empty_result");
        assert_eq!(err.store_status(), None);
    }

    #[test]
    fn test_invalid_queryでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_select");
            let _enter = span.enter();

            let err = InfraError::invalid_query("テーブル名が空です");

            assert!(matches!(err.kind(), InfraErrorKind::InvalidQuery(msg) if msg == "テーブル名が空です"));
            let trace_str = format!("{}", err.span_trace());
            assert!(
                trace_str.contains("test_select"),
                "SpanTrace がスパン名を含むこと: {trace_str}",
            );
        });
    }

    #[test]
    fn test_from_serde_json_errorはsourceを保持する() {
        use std::error::Error;

        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: InfraError = json_err.into();

        assert!(matches!(err.kind(), InfraErrorKind::Serialization(_)));
        assert!(err.source().is_some());
    }
}
