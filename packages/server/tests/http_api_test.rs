//! End-to-end tests for the HTTP API.

mod common;

use common::{TestClient, TestServer};
use irori_server::domain::{ChatMessage, MessageContent, MessageRepository, Timestamp, Username};

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェックが ok を返す
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let response = reqwest::get(server.http_url("/api/health")).await.unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn test_get_sessions() {
    // テスト項目: 接続数、上限、アクティブな username（昇順）が返る
    // given (前提条件):
    let server = TestServer::start_with(|config| config.max_clients = 5).await;
    let _carol = TestClient::join(&server.ws_url(), "carol").await;
    let _alice = TestClient::join(&server.ws_url(), "alice").await;
    let _pending = TestClient::connect(&server.ws_url()).await;
    server.wait_for_registered(3).await;
    server.wait_for_active(2).await;

    // when (操作):
    let body: serde_json::Value = reqwest::get(server.http_url("/api/sessions"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(
        body,
        serde_json::json!({
            "active": 3,
            "capacity": 5,
            "usernames": ["alice", "carol"],
        })
    );
}

#[tokio::test]
async fn test_get_history() {
    // テスト項目: 保存済みの履歴がタイムスタンプの昇順で返る
    // given (前提条件):
    let server = TestServer::start().await;
    for (timestamp_ms, content) in [(1672498802000, "later"), (1672498801000, "earlier")] {
        server
            .repository
            .insert_message(&ChatMessage::new(
                Timestamp::new(timestamp_ms),
                Username::new("alice".to_string()).unwrap(),
                MessageContent::new(content.to_string()).unwrap(),
            ))
            .await
            .unwrap();
    }

    // when (操作):
    let body: serde_json::Value = reqwest::get(server.http_url("/api/history"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(
        body,
        serde_json::json!([
            {"timestamp": "2023-01-01T00:00:01+09:00", "username": "alice", "message": "earlier"},
            {"timestamp": "2023-01-01T00:00:02+09:00", "username": "alice", "message": "later"},
        ])
    );
}
