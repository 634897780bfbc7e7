//! # クエリビルダー
//!
//! PostgREST 形式のテーブル API に対するリクエストを組み立てて送信する。
//!
//! ```text
//! BaasClient::from(table) → Table ─┬─ select(columns) → SelectQuery
//!                                  ├─ insert(value)   → InsertQuery
//!                                  ├─ update(value)   → UpdateQuery
//!                                  └─ delete()        → DeleteQuery
//! ```
//!
//! 各クエリは `execute()` でまず自身を検証し、不正なら
//! [`InfraErrorKind::InvalidQuery`](crate::InfraErrorKind::InvalidQuery) を
//! ネットワーク呼び出しなしで返す。リトライは行わない。
//!
//! ## URL とヘッダーの対応
//!
//! | 操作 | 表現 |
//! |------|------|
//! | `eq(col, v)` | クエリパラメータ `col=eq.v`（複数指定は AND） |
//! | `order(col, dir)` | `order=col.asc` / `order=col.desc` |
//! | `limit(n)` | `limit=n` |
//! | `range(a, b)` | ヘッダー `Range: items=a-b` |
//! | `count(Exact)` | ヘッダー `Prefer: count=exact` |

use http::{HeaderName, Method, header};
use serde_json::Value;
use strum::Display;

use crate::{
    client::BaasClient,
    error::InfraError,
    transport::{HttpRequest, HttpResponse},
};

const PREFER: HeaderName = HeaderName::from_static("prefer");
const RETURN_REPRESENTATION: &str = "return=representation";

/// 並び順
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// 件数カウントの方式（`Prefer: count=...`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CountOption {
    Exact,
    Planned,
    Estimated,
}

/// クエリ実行結果
///
/// `data` は常に配列として正規化される（オブジェクト応答は1要素、空ボディは空配列）。
/// `count` は件数カウントを要求し、かつ `Content-Range` に総数が含まれた場合のみ `Some`。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreResponse {
    pub data:  Vec<Value>,
    pub count: Option<u64>,
}

impl StoreResponse {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn first(&self) -> Option<&Value> {
        self.data.first()
    }

    /// 先頭行を取り出す（単一行取得用）
    pub fn into_first(self) -> Option<Value> {
        self.data.into_iter().next()
    }

    /// `data` を JSON 配列に変換する
    pub fn into_array(self) -> Value {
        Value::Array(self.data)
    }
}

/// 操作対象のテーブル
#[derive(Debug, Clone)]
pub struct Table {
    client: BaasClient,
    name:   String,
}

impl Table {
    pub(crate) fn new(client: BaasClient, name: String) -> Self {
        Self { client, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 参照クエリを開始する（`columns` は `"*"` や `"id, badges(*)"` など）
    pub fn select(self, columns: impl Into<String>) -> SelectQuery {
        SelectQuery {
            table:   self,
            columns: columns.into(),
            filters: Vec::new(),
            order:   None,
            limit:   None,
            range:   None,
            count:   None,
        }
    }

    /// 挿入クエリを開始する（オブジェクトまたはオブジェクトの配列）
    pub fn insert(self, value: Value) -> InsertQuery {
        InsertQuery { table: self, value }
    }

    /// 更新クエリを開始する（部分フィールドのオブジェクト）
    pub fn update(self, value: Value) -> UpdateQuery {
        UpdateQuery {
            table: self,
            value,
            filters: Vec::new(),
        }
    }

    pub fn delete(self) -> DeleteQuery {
        DeleteQuery {
            table:   self,
            filters: Vec::new(),
        }
    }

    fn url(&self, params: &[(String, String)]) -> String {
        let mut url = format!(
            "{}/rest/v1/{}",
            self.client.base_url(),
            urlencoding::encode(&self.name)
        );
        if !params.is_empty() {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    async fn send(&self, request: HttpRequest, counted: bool) -> Result<StoreResponse, InfraError> {
        let method = request.method.clone();
        let response = self.client.send(request).await?;
        tracing::debug!(
            table = %self.name,
            method = %method,
            status = response.status.as_u16(),
            "BaaS テーブル操作完了"
        );
        parse_response(response, counted)
    }
}

#[derive(Debug, Clone)]
struct Filter {
    column: String,
    value:  String,
}

impl Filter {
    fn param(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", self.value))
    }
}

#[derive(Debug, Clone, Copy)]
enum RangeSpec {
    Items { start: u64, end: u64 },
    Page { page: u32, page_size: u32 },
}

impl RangeSpec {
    /// `(start, end)` の包含範囲に解決する
    fn resolve(self) -> Result<(u64, u64), InfraError> {
        match self {
            Self::Items { start, end } if start > end => Err(InfraError::invalid_query(format!(
                "range の開始位置 {start} が終了位置 {end} より大きいです"
            ))),
            Self::Items { start, end } => Ok((start, end)),
            Self::Page { page, page_size } if page == 0 || page_size == 0 => Err(
                InfraError::invalid_query("page と page_size は 1 以上である必要があります"),
            ),
            Self::Page { page, page_size } => {
                let start = u64::from(page - 1) * u64::from(page_size);
                Ok((start, start + u64::from(page_size) - 1))
            }
        }
    }
}

/// 参照クエリ
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table:   Table,
    columns: String,
    filters: Vec<Filter>,
    order:   Option<(String, Direction)>,
    limit:   Option<u64>,
    range:   Option<RangeSpec>,
    count:   Option<CountOption>,
}

impl SelectQuery {
    /// 等価フィルタを追加する（複数指定は AND）
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value:  value.into(),
        });
        self
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// 取得範囲を行番号（0 始まり、両端含む）で指定する
    pub fn range(mut self, start: u64, end: u64) -> Self {
        self.range = Some(RangeSpec::Items { start, end });
        self
    }

    /// ページ番号（1 始まり）とページサイズで取得範囲を指定する
    pub fn paginate(mut self, page: u32, page_size: u32) -> Self {
        self.range = Some(RangeSpec::Page { page, page_size });
        self
    }

    pub fn count(mut self, option: CountOption) -> Self {
        self.count = Some(option);
        self
    }

    pub(crate) fn build(&self) -> Result<HttpRequest, InfraError> {
        validate_name("テーブル名", &self.table.name)?;
        validate_name("select の列指定", &self.columns)?;
        validate_filters(&self.filters)?;

        let mut params = vec![("select".to_string(), self.columns.clone())];
        params.extend(self.filters.iter().map(Filter::param));
        if let Some((column, direction)) = &self.order {
            validate_name("order の列名", column)?;
            params.push(("order".to_string(), format!("{column}.{direction}")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        let mut request = self.table.client.request(Method::GET, self.table.url(&params))?;
        if let Some(range) = self.range {
            let (start, end) = range.resolve()?;
            request = request.header(header::RANGE, &format!("items={start}-{end}"))?;
        }
        if let Some(count) = self.count {
            request = request.header(PREFER, &format!("count={count}"))?;
        }
        Ok(request)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(table = %self.table.name))]
    pub async fn execute(self) -> Result<StoreResponse, InfraError> {
        let request = self.build()?;
        self.table.send(request, self.count.is_some()).await
    }
}

/// 挿入クエリ
#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: Table,
    value: Value,
}

impl InsertQuery {
    pub(crate) fn build(&self) -> Result<HttpRequest, InfraError> {
        validate_name("テーブル名", &self.table.name)?;
        validate_payload("insert", &self.value, true)?;

        let body = serde_json::to_vec(&self.value)?;
        Ok(self
            .table
            .client
            .request(Method::POST, self.table.url(&[]))?
            .header(header::CONTENT_TYPE, "application/json")?
            .header(PREFER, RETURN_REPRESENTATION)?
            .body(body))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(table = %self.table.name))]
    pub async fn execute(self) -> Result<StoreResponse, InfraError> {
        let request = self.build()?;
        self.table.send(request, false).await
    }

    /// 作成した 1 行を返す
    ///
    /// 2xx でも行が返らなければ [`InfraErrorKind::EmptyResult`](crate::InfraErrorKind::EmptyResult)。
    pub async fn execute_single(self) -> Result<Value, InfraError> {
        let table = self.table.name.clone();
        self.execute()
            .await?
            .into_first()
            .ok_or_else(|| InfraError::empty_result(table))
    }
}

/// 更新クエリ
///
/// フィルタなしの全件更新は `InvalidQuery` として拒否する。
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    table:   Table,
    value:   Value,
    filters: Vec<Filter>,
}

impl UpdateQuery {
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value:  value.into(),
        });
        self
    }

    pub(crate) fn build(&self) -> Result<HttpRequest, InfraError> {
        validate_name("テーブル名", &self.table.name)?;
        validate_payload("update", &self.value, false)?;
        require_filters("update", &self.filters)?;

        let params: Vec<_> = self.filters.iter().map(Filter::param).collect();
        let body = serde_json::to_vec(&self.value)?;
        Ok(self
            .table
            .client
            .request(Method::PATCH, self.table.url(&params))?
            .header(header::CONTENT_TYPE, "application/json")?
            .header(PREFER, RETURN_REPRESENTATION)?
            .body(body))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(table = %self.table.name))]
    pub async fn execute(self) -> Result<StoreResponse, InfraError> {
        let request = self.build()?;
        self.table.send(request, false).await
    }
}

/// 削除クエリ
///
/// フィルタなしの全件削除は `InvalidQuery` として拒否する。
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    table:   Table,
    filters: Vec<Filter>,
}

impl DeleteQuery {
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value:  value.into(),
        });
        self
    }

    pub(crate) fn build(&self) -> Result<HttpRequest, InfraError> {
        validate_name("テーブル名", &self.table.name)?;
        require_filters("delete", &self.filters)?;

        let params: Vec<_> = self.filters.iter().map(Filter::param).collect();
        self.table
            .client
            .request(Method::DELETE, self.table.url(&params))?
            .header(PREFER, RETURN_REPRESENTATION)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(table = %self.table.name))]
    pub async fn execute(self) -> Result<StoreResponse, InfraError> {
        let request = self.build()?;
        self.table.send(request, false).await
    }
}

fn validate_name(what: &str, name: &str) -> Result<(), InfraError> {
    if name.trim().is_empty() {
        return Err(InfraError::invalid_query(format!("{what}が空です")));
    }
    Ok(())
}

fn validate_filters(filters: &[Filter]) -> Result<(), InfraError> {
    filters
        .iter()
        .try_for_each(|f| validate_name("フィルタの列名", &f.column))
}

fn require_filters(op: &str, filters: &[Filter]) -> Result<(), InfraError> {
    if filters.is_empty() {
        return Err(InfraError::invalid_query(format!(
            "{op} にはフィルタが1つ以上必要です"
        )));
    }
    validate_filters(filters)
}

fn validate_payload(op: &str, value: &Value, allow_array: bool) -> Result<(), InfraError> {
    let is_row = |v: &Value| matches!(v, Value::Object(map) if !map.is_empty());
    let valid = match value {
        Value::Array(items) if allow_array => !items.is_empty() && items.iter().all(is_row),
        other => is_row(other),
    };
    if valid {
        Ok(())
    } else {
        Err(InfraError::invalid_query(format!(
            "{op} のボディは空でないオブジェクトである必要があります"
        )))
    }
}

/// `Content-Range: 0-9/42` から総数を取り出す（`*` は不明として `None`）
fn parse_total(content_range: &str) -> Option<u64> {
    content_range.rsplit_once('/')?.1.trim().parse().ok()
}

fn parse_response(response: HttpResponse, counted: bool) -> Result<StoreResponse, InfraError> {
    if !response.status.is_success() {
        return Err(InfraError::store(response.status.as_u16(), response.text()));
    }

    let count = if counted {
        response.header_str("content-range").and_then(parse_total)
    } else {
        None
    };

    let data = if response.body.iter().all(u8::is_ascii_whitespace) {
        Vec::new()
    } else {
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(Value::Array(rows)) => rows,
            Ok(Value::Null) => Vec::new(),
            Ok(row) => vec![row],
            Err(e) => {
                tracing::warn!(error = %e, "BaaS レスポンスを JSON として解釈できないため空として扱う");
                Vec::new()
            }
        }
    };

    Ok(StoreResponse { data, count })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::{HeaderValue, StatusCode};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::{InfraErrorKind, mock::InMemoryBaas};

    fn client() -> BaasClient {
        BaasClient::new("https://xyz.supabase.co", "key")
    }

    fn query_pairs(url: &str) -> Vec<String> {
        url.split_once('?')
            .map(|(_, q)| q.split('&').map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn assert_invalid(result: Result<HttpRequest, InfraError>) {
        let err = result.unwrap_err();
        assert!(
            matches!(err.kind(), InfraErrorKind::InvalidQuery(_)),
            "InvalidQuery であること: {err:?}"
        );
    }

    #[test]
    fn test_eqはcol_eq_vパラメータを1つ生成する() {
        let request = client().from("checkins").select("*").eq("user_id", "u1").build().unwrap();

        assert_eq!(request.method, Method::GET);
        assert!(request.url.starts_with("https://xyz.supabase.co/rest/v1/checkins?"));
        assert_eq!(query_pairs(&request.url), vec!["select=%2A", "user_id=eq.u1"]);
    }

    #[test]
    fn test_複数のeqは独立したパラメータになる() {
        let request = client()
            .from("tasks")
            .select("*")
            .eq("user_id", "u1")
            .eq("status", "done")
            .order("created_at", Direction::Desc)
            .limit(5)
            .build()
            .unwrap();

        assert_eq!(
            query_pairs(&request.url),
            vec![
                "select=%2A",
                "user_id=eq.u1",
                "status=eq.done",
                "order=created_at.desc",
                "limit=5",
            ]
        );
    }

    #[test]
    fn test_フィルタ値はパーセントエンコードされる() {
        let request = client().from("users").select("*").eq("name", "a&b c").build().unwrap();

        assert_eq!(query_pairs(&request.url)[1], "name=eq.a%26b%20c");
    }

    #[rstest]
    #[case(1, 10, "items=0-9")]
    #[case(2, 10, "items=10-19")]
    #[case(3, 20, "items=40-59")]
    fn test_paginateはrangeヘッダーに変換される(
        #[case] page: u32,
        #[case] page_size: u32,
        #[case] expected: &str,
    ) {
        let request = client().from("secrets").select("*").paginate(page, page_size).build().unwrap();

        assert_eq!(request.header_str("range"), Some(expected));
    }

    #[test]
    fn test_countはpreferヘッダーを付与する() {
        let request = client()
            .from("secrets")
            .select("*")
            .count(CountOption::Exact)
            .build()
            .unwrap();

        assert_eq!(request.header_str("prefer"), Some("count=exact"));
        assert_eq!(request.header_str("apikey"), Some("key"));
        assert_eq!(request.header_str("authorization"), Some("Bearer key"));
    }

    #[test]
    fn test_insertはpostとjsonボディで送る() {
        let request = client()
            .from("checkins")
            .insert(json!({"user_id": "u1", "content": "hi"}))
            .build()
            .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://xyz.supabase.co/rest/v1/checkins");
        assert_eq!(request.header_str("content-type"), Some("application/json"));
        assert_eq!(request.header_str("prefer"), Some("return=representation"));
        let body: Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(body, json!({"user_id": "u1", "content": "hi"}));
    }

    #[test]
    fn test_updateとdeleteはフィルタ付きで送る() {
        let update = client()
            .from("tasks")
            .update(json!({"title": "new"}))
            .eq("id", "t1")
            .build()
            .unwrap();
        let delete = client().from("tasks").delete().eq("id", "t1").build().unwrap();

        assert_eq!(update.method, Method::PATCH);
        assert_eq!(update.url, "https://xyz.supabase.co/rest/v1/tasks?id=eq.t1");
        assert_eq!(delete.method, Method::DELETE);
        assert_eq!(delete.url, "https://xyz.supabase.co/rest/v1/tasks?id=eq.t1");
    }

    #[test]
    fn test_不正なクエリはbuild時に拒否される() {
        assert_invalid(client().from("").select("*").build());
        assert_invalid(client().from("users").select(" ").build());
        assert_invalid(client().from("users").select("*").eq("", "x").build());
        assert_invalid(client().from("users").select("*").range(10, 9).build());
        assert_invalid(client().from("users").select("*").paginate(0, 10).build());
        assert_invalid(client().from("users").select("*").paginate(1, 0).build());
        assert_invalid(client().from("users").insert(json!({})).build());
        assert_invalid(client().from("users").insert(json!([])).build());
        assert_invalid(client().from("users").insert(json!("text")).build());
        assert_invalid(client().from("users").update(json!({"a": 1})).build());
        assert_invalid(client().from("users").update(json!({})).eq("id", "1").build());
        assert_invalid(client().from("users").delete().build());
    }

    #[tokio::test]
    async fn test_不正なクエリはネットワーク呼び出しを行わない() {
        let baas = InMemoryBaas::new();
        let client = baas.client();

        let result = client.from("users").delete().execute().await;

        assert!(result.is_err());
        assert_eq!(baas.request_count(), 0);
    }

    #[test]
    fn test_parse_total() {
        assert_eq!(parse_total("0-9/42"), Some(42));
        assert_eq!(parse_total("*/0"), Some(0));
        assert_eq!(parse_total("0-9/*"), None);
        assert_eq!(parse_total("garbage"), None);
    }

    #[test]
    fn test_parse_response_非2xxはボディをメッセージにする() {
        let response = HttpResponse::new(StatusCode::CONFLICT, r#"{"message":"dup"}"#);

        let err = parse_response(response, false).unwrap_err();

        assert!(matches!(
            err.kind(),
            InfraErrorKind::Store { status: 409, message } if message == r#"{"message":"dup"}"#
        ));
    }

    #[test]
    fn test_parse_response_空ボディのエラーはstatus_n() {
        let response = HttpResponse::new(StatusCode::BAD_GATEWAY, "");

        let err = parse_response(response, false).unwrap_err();

        assert_eq!(err.to_string(), "status 502");
    }

    #[rstest]
    #[case("", vec![])]
    #[case("not json", vec![])]
    #[case(r#"{"id":"1"}"#, vec![json!({"id": "1"})])]
    #[case(r#"[{"id":"1"},{"id":"2"}]"#, vec![json!({"id": "1"}), json!({"id": "2"})])]
    fn test_parse_response_dataを配列に正規化する(#[case] body: &str, #[case] expected: Vec<Value>) {
        let response = HttpResponse::new(StatusCode::OK, body.to_string());

        let parsed = parse_response(response, false).unwrap();

        assert_eq!(parsed.data, expected);
        assert_eq!(parsed.count, None);
    }

    #[test]
    fn test_parse_response_カウント要求時のみcountを読む() {
        let response = || {
            HttpResponse::new(StatusCode::PARTIAL_CONTENT, "[]")
                .with_header(header::CONTENT_RANGE, HeaderValue::from_static("10-19/57"))
        };

        assert_eq!(parse_response(response(), true).unwrap().count, Some(57));
        assert_eq!(parse_response(response(), false).unwrap().count, None);
    }

    #[tokio::test]
    async fn test_execute_single_作成した行を返す() {
        let baas = InMemoryBaas::new();

        let row = baas
            .client()
            .from("tasks")
            .insert(json!({"title": "買い物"}))
            .execute_single()
            .await
            .unwrap();

        assert_eq!(row["title"], "買い物");
        assert!(row["id"].is_string());
    }

    #[tokio::test]
    async fn test_execute_single_2xxで行がなければempty_result() {
        struct NoContent;

        #[async_trait::async_trait]
        impl crate::transport::HttpTransport for NoContent {
            async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, InfraError> {
                Ok(HttpResponse::new(StatusCode::CREATED, ""))
            }
        }

        let client = BaasClient::with_transport("http://baas", "key", Arc::new(NoContent));

        let err = client
            .from("tasks")
            .insert(json!({"title": "x"}))
            .execute_single()
            .await
            .unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::EmptyResult(table) if table == "tasks"));
    }

    #[tokio::test]
    async fn test_transportエラーはそのまま返る() {
        struct Unreachable;

        #[async_trait::async_trait]
        impl crate::transport::HttpTransport for Unreachable {
            async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, InfraError> {
                Err(InfraError::transport("connection refused"))
            }
        }

        let client = BaasClient::with_transport("http://baas", "key", Arc::new(Unreachable));

        let err = client.from("users").select("*").execute().await.unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::Transport(_)));
    }
}
