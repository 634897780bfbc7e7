//! # テスト用インメモリ BaaS
//!
//! PostgREST テーブル API とオブジェクトストレージの必要最小限を
//! メモリ上で再現する [`HttpTransport`] 実装。受け取ったリクエストはすべて記録する。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! checkin-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! 対応範囲:
//! - `eq.` フィルタ（AND）、`order`、`limit`、`Range: items=a-b`、`Prefer: count=exact`
//! - `select` の列射影と `name(*)` 形式の埋め込み（`{name の単数形}_id` で結合）
//! - POST は `id` 未指定の行に UUID を採番し、挿入行を返す
//! - PATCH はフィールドをマージ、DELETE は削除し、対象行を返す
//! - ストレージの PUT とバケット一覧

use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode, header};
use serde_json::{Map, Value, json};

use crate::{
    client::BaasClient,
    error::InfraError,
    transport::{HttpRequest, HttpResponse, HttpTransport},
};

/// インメモリ BaaS のベース URL
pub const MOCK_BASE_URL: &str = "http://baas.test";
/// インメモリ BaaS に設定される API キー
pub const MOCK_API_KEY: &str = "test-key";

#[derive(Default)]
struct State {
    tables:   HashMap<String, Vec<Value>>,
    buckets:  Vec<String>,
    objects:  HashMap<(String, String), Bytes>,
    requests: Vec<HttpRequest>,
    failure:  Option<(StatusCode, String)>,
}

/// インメモリ BaaS
///
/// `Clone` は同じ状態を共有する。
#[derive(Clone)]
pub struct InMemoryBaas {
    state: Arc<Mutex<State>>,
}

impl Default for InMemoryBaas {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBaas {
    /// `images` バケットのみを持つ空の BaaS を作成する
    pub fn new() -> Self {
        Self::with_buckets(&["images"])
    }

    pub fn with_buckets(buckets: &[&str]) -> Self {
        let state = State {
            buckets: buckets.iter().map(|b| (*b).to_string()).collect(),
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// この BaaS に接続されたクライアントを作成する
    pub fn client(&self) -> BaasClient {
        BaasClient::with_transport(MOCK_BASE_URL, MOCK_API_KEY, Arc::new(self.clone()))
    }

    /// テーブルに行を追加する
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.state
            .lock()
            .unwrap()
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// テーブルの全行を取得する
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<Bytes> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    /// 以降のすべてのリクエストに指定のエラーレスポンスを返す
    pub fn fail_with(&self, status: StatusCode, body: &str) {
        self.state.lock().unwrap().failure = Some((status, body.to_string()));
    }

    /// 受信したリクエストの一覧
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

#[async_trait]
impl HttpTransport for InMemoryBaas {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, InfraError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        if let Some((status, body)) = &state.failure {
            return Ok(HttpResponse::new(*status, body.clone()));
        }

        let Some(rest) = request.url.strip_prefix(MOCK_BASE_URL) else {
            return Err(InfraError::transport(format!("unknown host: {}", request.url)));
        };
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let params = parse_query(query);

        let response = if let Some(table) = path.strip_prefix("/rest/v1/") {
            let table = decode(table);
            handle_table(&mut state, &table, &request, &params)
        } else if let Some(object) = path.strip_prefix("/storage/v1/object/") {
            handle_upload(&mut state, object, &request)
        } else if path == "/storage/v1/bucket" && request.method == Method::GET {
            let buckets: Vec<Value> = state
                .buckets
                .iter()
                .map(|b| json!({"id": b, "name": b, "public": true}))
                .collect();
            json_response(StatusCode::OK, &Value::Array(buckets))
        } else {
            json_response(StatusCode::NOT_FOUND, &json!({"message": "not found"}))
        };
        Ok(response)
    }
}

fn decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let (k, v) = p.split_once('=').unwrap_or((p, ""));
            (decode(k), decode(v))
        })
        .collect()
}

fn json_response(status: StatusCode, body: &Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string())
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => as_text(x).cmp(&as_text(y)),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
    }
}

/// `eq.` フィルタ（`select` / `order` / `limit` 以外のパラメータ）
fn filters(params: &[(String, String)]) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "select" | "order" | "limit"))
        .filter_map(|(k, v)| v.strip_prefix("eq.").map(|v| (k.clone(), v.to_string())))
        .collect()
}

fn matches_all(row: &Value, filters: &[(String, String)]) -> bool {
    filters
        .iter()
        .all(|(col, expected)| row.get(col).is_some_and(|v| as_text(v) == *expected))
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn handle_table(
    state: &mut State,
    table: &str,
    request: &HttpRequest,
    params: &[(String, String)],
) -> HttpResponse {
    let filters = filters(params);
    match request.method {
        Method::GET => handle_select(state, table, request, params, &filters),
        Method::POST => {
            let Some(rows) = parse_body(request) else {
                return json_response(StatusCode::BAD_REQUEST, &json!({"message": "invalid body"}));
            };
            let inserted: Vec<Value> = rows
                .into_iter()
                .map(|mut row| {
                    if let Some(obj) = row.as_object_mut() {
                        obj.entry("id")
                            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
                    }
                    row
                })
                .collect();
            state
                .tables
                .entry(table.to_string())
                .or_default()
                .extend(inserted.iter().cloned());
            json_response(StatusCode::CREATED, &Value::Array(inserted))
        }
        Method::PATCH => {
            let patch = parse_body(request)
                .and_then(|rows| rows.into_iter().next())
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default();
            let rows = state.tables.entry(table.to_string()).or_default();
            let mut updated = Vec::new();
            for row in rows.iter_mut().filter(|r| matches_all(r, &filters)) {
                if let Some(obj) = row.as_object_mut() {
                    obj.extend(patch.clone());
                }
                updated.push(row.clone());
            }
            json_response(StatusCode::OK, &Value::Array(updated))
        }
        Method::DELETE => {
            let rows = state.tables.entry(table.to_string()).or_default();
            let (removed, kept): (Vec<_>, Vec<_>) =
                rows.drain(..).partition(|r| matches_all(r, &filters));
            *rows = kept;
            json_response(StatusCode::OK, &Value::Array(removed))
        }
        _ => json_response(StatusCode::METHOD_NOT_ALLOWED, &json!({"message": "method not allowed"})),
    }
}

fn parse_body(request: &HttpRequest) -> Option<Vec<Value>> {
    let body = request.body.as_ref()?;
    match serde_json::from_slice::<Value>(body).ok()? {
        Value::Array(rows) => Some(rows),
        row @ Value::Object(_) => Some(vec![row]),
        _ => None,
    }
}

fn handle_select(
    state: &State,
    table: &str,
    request: &HttpRequest,
    params: &[(String, String)],
    filters: &[(String, String)],
) -> HttpResponse {
    let mut rows: Vec<Value> = state
        .tables
        .get(table)
        .map(|rows| rows.iter().filter(|r| matches_all(r, filters)).cloned().collect())
        .unwrap_or_default();

    if let Some((column, direction)) = param(params, "order").and_then(|o| o.rsplit_once('.')) {
        rows.sort_by(|a, b| compare(a.get(column), b.get(column)));
        if direction == "desc" {
            rows.reverse();
        }
    }
    if let Some(limit) = param(params, "limit").and_then(|l| l.parse::<usize>().ok()) {
        rows.truncate(limit);
    }

    let total = rows.len();
    let mut start = 0;
    if let Some((from, to)) = request
        .header_str("range")
        .and_then(|r| r.strip_prefix("items="))
        .and_then(|r| r.split_once('-'))
        .and_then(|(a, b)| Some((a.parse::<usize>().ok()?, b.parse::<usize>().ok()?)))
    {
        start = from;
        rows = rows.into_iter().skip(from).take(to.saturating_sub(from) + 1).collect();
    }

    let columns = param(params, "select").unwrap_or("*");
    let rows: Vec<Value> = rows.iter().map(|r| project(state, r, columns)).collect();

    let mut response = json_response(StatusCode::OK, &Value::Array(rows.clone()));
    if request.header_str("prefer").is_some_and(|p| p.contains("count=")) {
        let content_range = if rows.is_empty() {
            format!("*/{total}")
        } else {
            format!("{start}-{}/{total}", start + rows.len() - 1)
        };
        if let Ok(value) = HeaderValue::from_str(&content_range) {
            response = response.with_header(header::CONTENT_RANGE, value);
        }
    }
    response
}

/// `select` の列指定に従って行を射影し、`name(*)` を埋め込む
fn project(state: &State, row: &Value, columns: &str) -> Value {
    let mut out = Map::new();
    for column in columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if column == "*" {
            if let Some(obj) = row.as_object() {
                out.extend(obj.clone());
            }
        } else if let Some(embedded) = column.strip_suffix("(*)") {
            let key = format!("{}_id", embedded.strip_suffix('s').unwrap_or(embedded));
            let target = row.get(&key).map(as_text);
            let joined = state
                .tables
                .get(embedded)
                .and_then(|rows| {
                    rows.iter()
                        .find(|r| r.get("id").map(as_text) == target)
                        .cloned()
                })
                .unwrap_or(Value::Null);
            out.insert(embedded.to_string(), joined);
        } else if let Some(value) = row.get(column) {
            out.insert(column.to_string(), value.clone());
        }
    }
    Value::Object(out)
}

fn handle_upload(state: &mut State, object: &str, request: &HttpRequest) -> HttpResponse {
    if request.method != Method::PUT && request.method != Method::POST {
        return json_response(StatusCode::METHOD_NOT_ALLOWED, &json!({"message": "method not allowed"}));
    }
    let Some((bucket, path)) = object.split_once('/') else {
        return json_response(StatusCode::BAD_REQUEST, &json!({"message": "invalid path"}));
    };
    let (bucket, path) = (decode(bucket), decode(path));
    if !state.buckets.iter().any(|b| *b == bucket) {
        return json_response(
            StatusCode::NOT_FOUND,
            &json!({"statusCode": "404", "error": "Bucket not found", "message": "Bucket not found"}),
        );
    }
    let content = request.body.clone().unwrap_or_default();
    state
        .objects
        .insert((bucket.clone(), path.clone()), content);
    json_response(StatusCode::OK, &json!({"Key": format!("{bucket}/{path}")}))
}
