//! BaaS クライアントの結合テスト
//!
//! インメモリ BaaS を相手に、クエリビルダー・ストレージクライアントが
//! 送るリクエストと受け取った結果の扱いを確認する。

use bytes::Bytes;
use checkin_infra::{
    InfraErrorKind,
    mock::{InMemoryBaas, MOCK_BASE_URL},
    query::{CountOption, Direction},
    tables,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_insertした値をselectで同じ値として読み戻せる() {
    let baas = InMemoryBaas::new();
    let client = baas.client();
    let record = json!({
        "user_id": "u1",
        "content": "朝のランニング",
        "images": [],
        "created_at": "2024-05-01T07:00:00Z"
    });

    let inserted = client
        .from(tables::CHECKINS)
        .insert(record.clone())
        .execute()
        .await
        .unwrap()
        .into_first()
        .unwrap();
    let id = inserted["id"].as_str().unwrap();

    let fetched = client
        .from(tables::CHECKINS)
        .select("*")
        .eq("id", id)
        .execute()
        .await
        .unwrap()
        .into_first()
        .unwrap();

    for (key, value) in record.as_object().unwrap() {
        assert_eq!(&fetched[key], value, "{key} が一致すること");
    }
}

#[tokio::test]
async fn test_selectはeqパラメータをそのまま送る() {
    let baas = InMemoryBaas::new();

    baas.client()
        .from(tables::FRIENDS)
        .select("*")
        .eq("user_id", "u1")
        .execute()
        .await
        .unwrap();

    let requests = baas.requests();
    assert_eq!(
        requests[0].url,
        format!("{MOCK_BASE_URL}/rest/v1/friends?select=%2A&user_id=eq.u1")
    );
}

#[tokio::test]
async fn test_2ページ目は10から19行目を要求する() {
    let baas = InMemoryBaas::new();

    let response = baas
        .client()
        .from(tables::SECRETS)
        .select("*")
        .order("created_at", Direction::Desc)
        .paginate(2, 10)
        .count(CountOption::Exact)
        .execute()
        .await
        .unwrap();

    assert_eq!(baas.requests()[0].header_str("range"), Some("items=10-19"));
    assert!(response.is_empty());
    assert_eq!(response.count, Some(0));
}

#[tokio::test]
async fn test_storeエラーは生のボディを保持する() {
    let baas = InMemoryBaas::new();
    baas.fail_with(
        http::StatusCode::BAD_REQUEST,
        r#"{"code":"PGRST204","message":"column not found"}"#,
    );

    let err = baas
        .client()
        .from(tables::TASKS)
        .insert(json!({"user_id": "u1"}))
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(
        err.kind(),
        InfraErrorKind::Store { status: 400, message } if message.contains("PGRST204")
    ));
}

#[tokio::test]
async fn test_アップロード後の公開urlはバケットとパスを含む() {
    let baas = InMemoryBaas::new();
    let bucket = baas.client().storage().from("images");

    let uploaded = bucket
        .upload("u1/photo.jpg", Bytes::from_static(b"jpeg"), Some("image/jpeg"))
        .await
        .unwrap();

    assert_eq!(
        bucket.public_url(&uploaded.path),
        format!("{MOCK_BASE_URL}/storage/v1/object/public/images/u1/photo.jpg")
    );
}
