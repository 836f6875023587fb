mod support;

use reqwest::{Client, StatusCode};
use serde_json::json;
use uuid::Uuid;

use support::{register_user, spawn_app};

async fn swipe(
    client: &Client,
    base_url: &str,
    token: &str,
    to_user_id: Uuid,
    action: &str,
) -> (StatusCode, serde_json::Value) {
    let response = client
        .post(format!("{}/api/v1/swipes", base_url))
        .bearer_auth(token)
        .json(&json!({ "to_user_id": to_user_id, "action": action }))
        .send()
        .await
        .expect("swipe request");
    let status = response.status();
    let body = response.json().await.unwrap_or(serde_json::Value::Null);
    (status, body)
}

#[tokio::test]
async fn mutual_like_flow_creates_single_room() {
    let app = spawn_app(20).await;
    let client = Client::new();

    let (alice_id, alice_token) = register_user(&client, &app.base_url, "alice").await;
    let (bob_id, bob_token) = register_user(&client, &app.base_url, "bob").await;

    let (status, first) = swipe(&client, &app.base_url, &alice_token, bob_id, "like").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["is_match"], false);
    assert!(first.get("room").is_none());

    let (status, second) = swipe(&client, &app.base_url, &bob_token, alice_id, "superlike").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["is_match"], true);
    let room_id = second["room"]["id"].as_str().expect("room id").to_owned();

    // 双方的配对与房间列表都指向同一条记录
    for token in [&alice_token, &bob_token] {
        let matches: serde_json::Value = client
            .get(format!("{}/api/v1/matches", app.base_url))
            .bearer_auth(token)
            .send()
            .await
            .expect("matches request")
            .json()
            .await
            .expect("matches json");
        assert_eq!(matches.as_array().map(Vec::len), Some(1));

        let rooms: serde_json::Value = client
            .get(format!("{}/api/v1/rooms", app.base_url))
            .bearer_auth(token)
            .send()
            .await
            .expect("rooms request")
            .json()
            .await
            .expect("rooms json");
        assert_eq!(rooms[0]["id"].as_str(), Some(room_id.as_str()));
    }

    assert_eq!(app.store.match_count(), 1);
    // 双方都收到配对推送
    assert_eq!(app.dispatcher.sent().len(), 2);
}

#[tokio::test]
async fn swipe_input_is_validated() {
    let app = spawn_app(20).await;
    let client = Client::new();

    let (alice_id, alice_token) = register_user(&client, &app.base_url, "alice").await;
    let (bob_id, _) = register_user(&client, &app.base_url, "bob").await;

    let (status, body) = swipe(&client, &app.base_url, &alice_token, bob_id, "poke").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ACTION");

    let (status, body) = swipe(&client, &app.base_url, &alice_token, alice_id, "like").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SELF_SWIPE");

    let (status, body) = swipe(&client, &app.base_url, &alice_token, Uuid::new_v4(), "like").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "USER_NOT_FOUND");

    let unauthenticated = client
        .post(format!("{}/api/v1/swipes", app.base_url))
        .json(&json!({ "to_user_id": bob_id, "action": "like" }))
        .send()
        .await
        .expect("request");
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn suggestions_exclude_swiped_users_and_honor_location() {
    let app = spawn_app(20).await;
    let client = Client::new();

    let (_, requester_token) = register_user(&client, &app.base_url, "requester").await;
    let (near_id, near_token) = register_user(&client, &app.base_url, "near").await;
    let (far_id, far_token) = register_user(&client, &app.base_url, "far").await;
    let (swiped_id, _) = register_user(&client, &app.base_url, "swiped").await;
    let (unlocated_id, _) = register_user(&client, &app.base_url, "unlocated").await;

    // 请求者与两位候选人设置坐标；swiped 被滑过，unlocated 没有坐标
    for (token, latitude) in [(&requester_token, 0.0), (&near_token, 0.1), (&far_token, 3.0)] {
        let response = client
            .put(format!("{}/api/v1/location", app.base_url))
            .bearer_auth(token)
            .json(&json!({ "latitude": latitude, "longitude": 0.0 }))
            .send()
            .await
            .expect("location request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    swipe(&client, &app.base_url, &requester_token, swiped_id, "dislike").await;

    let suggestions: serde_json::Value = client
        .get(format!("{}/api/v1/suggestions", app.base_url))
        .bearer_auth(&requester_token)
        .send()
        .await
        .expect("suggestions request")
        .json()
        .await
        .expect("suggestions json");

    let ids: Vec<String> = suggestions
        .as_array()
        .expect("array")
        .iter()
        .map(|user| user["id"].as_str().expect("id").to_owned())
        .collect();

    // 近的排在前面；被滑过的与没有坐标的都不出现
    assert_eq!(ids, vec![near_id.to_string(), far_id.to_string()]);
    assert!(!ids.contains(&swiped_id.to_string()));
    assert!(!ids.contains(&unlocated_id.to_string()));
}

#[tokio::test]
async fn rest_send_path_enforces_quota() {
    let app = spawn_app(2).await;
    let client = Client::new();

    let (alice_id, alice_token) = register_user(&client, &app.base_url, "alice").await;
    let (bob_id, bob_token) = register_user(&client, &app.base_url, "bob").await;

    swipe(&client, &app.base_url, &alice_token, bob_id, "like").await;
    let (_, matched) = swipe(&client, &app.base_url, &bob_token, alice_id, "like").await;
    let room_id = matched["room"]["id"].as_str().expect("room id").to_owned();

    for text in ["one", "two"] {
        let response = client
            .post(format!("{}/api/v1/rooms/{}/messages", app.base_url, room_id))
            .bearer_auth(&alice_token)
            .json(&json!({ "content": text }))
            .send()
            .await
            .expect("send request");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let blocked = client
        .post(format!("{}/api/v1/rooms/{}/messages", app.base_url, room_id))
        .bearer_auth(&alice_token)
        .json(&json!({ "content": "three" }))
        .send()
        .await
        .expect("send request");
    assert_eq!(blocked.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = blocked.json().await.expect("error body");
    assert_eq!(body["code"], "QUOTA_EXCEEDED");

    // 历史里只有两条，第三条没有落库
    let history: serde_json::Value = client
        .get(format!("{}/api/v1/rooms/{}/messages", app.base_url, room_id))
        .bearer_auth(&alice_token)
        .send()
        .await
        .expect("history request")
        .json()
        .await
        .expect("history json");
    let contents: Vec<&str> = history
        .as_array()
        .expect("array")
        .iter()
        .map(|message| message["content"].as_str().expect("content"))
        .collect();
    assert_eq!(contents, vec!["one", "two"]);

    // 会员绕过配额
    use application::UserRepository as _;
    let mut premium = app
        .store
        .find_by_id(domain::UserId::from(bob_id))
        .await
        .expect("load user")
        .expect("premium user exists");
    premium.set_premium(true, time::OffsetDateTime::now_utc());
    app.store.update(premium).await.expect("update premium");

    for index in 0..5 {
        let response = client
            .post(format!("{}/api/v1/rooms/{}/messages", app.base_url, room_id))
            .bearer_auth(&bob_token)
            .json(&json!({ "content": format!("premium {}", index) }))
            .send()
            .await
            .expect("send request");
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}

#[tokio::test]
async fn outsiders_cannot_read_or_write_rooms() {
    let app = spawn_app(20).await;
    let client = Client::new();

    let (alice_id, alice_token) = register_user(&client, &app.base_url, "alice").await;
    let (bob_id, bob_token) = register_user(&client, &app.base_url, "bob").await;
    let (_, eve_token) = register_user(&client, &app.base_url, "eve").await;

    swipe(&client, &app.base_url, &alice_token, bob_id, "like").await;
    let (_, matched) = swipe(&client, &app.base_url, &bob_token, alice_id, "like").await;
    let room_id = matched["room"]["id"].as_str().expect("room id").to_owned();

    let write = client
        .post(format!("{}/api/v1/rooms/{}/messages", app.base_url, room_id))
        .bearer_auth(&eve_token)
        .json(&json!({ "content": "let me in" }))
        .send()
        .await
        .expect("send request");
    assert_eq!(write.status(), StatusCode::FORBIDDEN);

    let read = client
        .get(format!("{}/api/v1/rooms/{}/messages", app.base_url, room_id))
        .bearer_auth(&eve_token)
        .send()
        .await
        .expect("history request");
    assert_eq!(read.status(), StatusCode::FORBIDDEN);

    assert_eq!(app.store.message_count(), 0);
}

#[tokio::test]
async fn profile_updates_are_whitelisted_and_quota_reset_works() {
    let app = spawn_app(1).await;
    let client = Client::new();

    let (_, token) = register_user(&client, &app.base_url, "alice").await;

    let updated: serde_json::Value = client
        .put(format!("{}/api/v1/profile", app.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "bio": "hello there",
            "interests": ["music", "travel"],
            "date_of_birth": "1995-04-23"
        }))
        .send()
        .await
        .expect("profile request")
        .json()
        .await
        .expect("profile json");

    assert_eq!(updated["bio"], "hello there");
    assert_eq!(updated["interests"][0], "music");
    assert_eq!(updated["date_of_birth"], "1995-04-23");
    // 邮箱不在白名单内，保持注册时的值
    assert_eq!(updated["email"], "alice@example.com");

    // 维护入口：没有过期配额时影响行数为 0
    let reset: serde_json::Value = client
        .post(format!("{}/api/v1/maintenance/quotas/reset", app.base_url))
        .send()
        .await
        .expect("reset request")
        .json()
        .await
        .expect("reset json");
    assert_eq!(reset["affected"], 0);
}
