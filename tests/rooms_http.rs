mod support;

use serde_json::json;
use support::{connect, ensure_server, paired, recv_json, send_json, unique_room};

async fn listed_rooms() -> Vec<serde_json::Value> {
    let base_url = ensure_server();
    let res = reqwest::get(format!("{base_url}/rooms"))
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = res.json().await.expect("json body");
    body["rooms"].as_array().cloned().expect("rooms array")
}

#[tokio::test]
async fn when_room_is_created_then_it_is_listed_with_one_member() {
    let room = unique_room("open");
    let mut a = connect().await;
    send_json(
        &mut a,
        json!({ "type": "createRoom", "name": room, "clientId": "lister" }),
    )
    .await;
    assert_eq!(recv_json(&mut a).await["type"], "roomCreated");

    let rooms = listed_rooms().await;
    assert!(rooms.contains(&json!({ "name": room, "count": 1 })));
}

#[tokio::test]
async fn when_room_is_full_then_it_is_not_listed() {
    let room = unique_room("closed");
    let (_a, _b) = paired(&room).await;

    let rooms = listed_rooms().await;
    assert!(rooms.iter().all(|entry| entry["name"] != room.as_str()));
}

#[tokio::test]
async fn when_get_rooms_is_sent_over_socket_then_listing_matches_http_shape() {
    let room = unique_room("socket-list");
    let mut a = connect().await;
    send_json(
        &mut a,
        json!({ "type": "createRoom", "name": room, "clientId": "socket-lister" }),
    )
    .await;
    recv_json(&mut a).await;

    send_json(&mut a, json!({ "type": "getRooms" })).await;
    let reply = recv_json(&mut a).await;

    assert_eq!(reply["type"], "roomsList");
    let rooms = reply["rooms"].as_array().expect("rooms array");
    assert!(rooms.contains(&json!({ "name": room, "count": 1 })));
}
