//! Application lifecycle tests over the real Telegram transport,
//! pointed at a wiremock stand-in for the Bot API.

use serde_json::json;
use std::time::Duration;

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::{app::TestAppBuilder, telegram_server::FakeTelegramServer, OPERATOR, STRANGER};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ping_update(update_id: i64, sender_id: i64) -> serde_json::Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": 1,
            "from": { "id": sender_id, "is_bot": false, "first_name": "Op" },
            "chat": { "id": sender_id, "type": "private" },
            "date": 1700000000,
            "text": "/ping",
            "entities": [{ "type": "bot_command", "offset": 0, "length": 5 }]
        }
    })
}

#[tokio::test]
async fn ping_round_trips_over_the_wire() {
    let server = FakeTelegramServer::start("TEST-TOKEN").await;
    server.script_updates(json!([ping_update(88, OPERATOR)])).await;
    server.expect_reply(OPERATOR, "pong 🏓", 1).await;

    let api_url = server.uri();
    let test_app = TestAppBuilder::new()
        .with_config_modifier(|config| config.telegram.api_url = api_url)
        .start()
        .await
        .unwrap();

    assert!(
        server
            .wait_for_requests("/sendMessage", 1, Duration::from_secs(5))
            .await,
        "the reply never reached the API"
    );

    test_app.shutdown(Duration::from_secs(5)).await.unwrap();
    server.server.verify().await;
}

#[tokio::test]
async fn strangers_are_ignored_over_the_wire() {
    let server = FakeTelegramServer::start("TEST-TOKEN").await;
    server
        .script_updates(json!([
            ping_update(100, STRANGER),
            ping_update(101, OPERATOR),
        ]))
        .await;
    server.expect_reply(OPERATOR, "pong 🏓", 1).await;

    let api_url = server.uri();
    let test_app = TestAppBuilder::new()
        .with_config_modifier(|config| config.telegram.api_url = api_url)
        .start()
        .await
        .unwrap();

    assert!(
        server
            .wait_for_requests("/sendMessage", 1, Duration::from_secs(5))
            .await
    );
    // Both updates were in the same batch, so once the operator's reply
    // is out, a reply to the stranger would already have been sent.
    assert_eq!(server.requests_for("/sendMessage").await, 1);

    test_app.shutdown(Duration::from_secs(5)).await.unwrap();
    server.server.verify().await;
}

#[tokio::test]
async fn startup_fails_when_the_token_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/botTEST-TOKEN/getMe"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let api_url = server.uri();
    let result = TestAppBuilder::new()
        .with_config_modifier(|config| config.telegram.api_url = api_url)
        .start()
        .await;

    let error = result.err().expect("startup should fail on a bad token");
    assert!(error.to_string().contains("getMe"));
}

#[tokio::test]
async fn app_shuts_down_cleanly_while_polling() {
    let server = FakeTelegramServer::start("TEST-TOKEN").await;
    server.script_updates(json!([])).await;

    let api_url = server.uri();
    let test_app = TestAppBuilder::new()
        .with_config_modifier(|config| config.telegram.api_url = api_url)
        .start()
        .await
        .unwrap();

    // Let it settle into the poll loop before pulling the plug.
    tokio::time::sleep(Duration::from_millis(100)).await;
    test_app.shutdown(Duration::from_secs(5)).await.unwrap();
}
