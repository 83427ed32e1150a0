use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pricewatch::{
    error::{DispatchError, FetchError},
    models::WatchedItem,
    services::{
        buff::{BuffClient, PriceSource},
        discord::{AlertSink, DiscordWebhook},
    },
};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Upstream {
    seen_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    seen_headers: Arc<Mutex<Vec<(String, String)>>>,
    posted: Arc<Mutex<Vec<Value>>>,
}

async fn sell_order(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    up.seen_headers
        .lock()
        .unwrap()
        .push((header("cookie"), header("user-agent")));
    up.seen_queries.lock().unwrap().push(q.clone());

    match q.get("goods_id").map(String::as_str) {
        Some("cheap") => Json(json!({
            "code": "OK",
            "data": { "items": [ { "price": "95" }, { "price": "97.5" } ] }
        }))
        .into_response(),
        Some("unlisted") => Json(json!({ "code": "OK", "data": { "items": [] } })).into_response(),
        Some("denied") => Json(json!({ "code": "Login Required" })).into_response(),
        Some("broken") => (StatusCode::OK, "<html>captcha</html>").into_response(),
        Some("slow") => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "code": "OK", "data": { "items": [ { "price": "1" } ] } })).into_response()
        }
        _ => StatusCode::BAD_GATEWAY.into_response(),
    }
}

async fn webhook(State(up): State<Upstream>, Json(body): Json<Value>) -> StatusCode {
    up.posted.lock().unwrap().push(body);
    StatusCode::NO_CONTENT
}

async fn start_upstream() -> (String, Upstream) {
    let up = Upstream::default();
    let app = Router::new()
        .route("/api/market/goods/sell_order", get(sell_order))
        .route("/hook", post(webhook))
        .route("/rejecting-hook", post(|| async { (StatusCode::BAD_REQUEST, "bad embed") }))
        .with_state(up.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), up)
}

fn buff(base: &str, timeout: Duration) -> BuffClient {
    BuffClient::new(base.to_string(), "csgo".into(), "session=abc".into(), timeout)
}

#[tokio::test]
async fn fetch_returns_first_sell_order_and_sends_credentials() {
    let (base, up) = start_upstream().await;

    let price = buff(&base, Duration::from_secs(5)).fetch_price("cheap").await;
    assert_eq!(price, Ok(95.0));

    let q = up.seen_queries.lock().unwrap()[0].clone();
    assert_eq!(q["game"], "csgo");
    assert_eq!(q["goods_id"], "cheap");
    assert_eq!(q["page_num"], "1");
    assert_eq!(q["sort_by"], "default");
    assert!(q["_"].parse::<i64>().is_ok());

    let (cookie, ua) = up.seen_headers.lock().unwrap()[0].clone();
    assert_eq!(cookie, "session=abc");
    assert!(ua.starts_with("Mozilla/5.0"));
}

#[tokio::test]
async fn unlisted_or_refused_item_is_no_data() {
    let (base, _up) = start_upstream().await;
    let client = buff(&base, Duration::from_secs(5));

    assert_eq!(client.fetch_price("unlisted").await, Err(FetchError::NoData));
    assert_eq!(client.fetch_price("denied").await, Err(FetchError::NoData));
}

#[tokio::test]
async fn bad_status_or_body_is_transient() {
    let (base, _up) = start_upstream().await;
    let client = buff(&base, Duration::from_secs(5));

    assert!(matches!(client.fetch_price("unknown").await, Err(FetchError::Transient(_))));
    assert!(matches!(client.fetch_price("broken").await, Err(FetchError::Transient(_))));
}

#[tokio::test]
async fn slow_upstream_hits_the_timeout() {
    let (base, _up) = start_upstream().await;
    let client = buff(&base, Duration::from_millis(200));

    let started = std::time::Instant::now();
    let res = client.fetch_price("slow").await;
    assert!(matches!(res, Err(FetchError::Transient(_))));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn unreachable_upstream_is_transient() {
    // nothing listens on port 9 locally
    let client = buff("http://127.0.0.1:9", Duration::from_secs(2));
    assert!(matches!(client.fetch_price("cheap").await, Err(FetchError::Transient(_))));
}

#[tokio::test]
async fn webhook_receives_embed() {
    let (base, up) = start_upstream().await;
    let hook = DiscordWebhook::new(
        format!("{base}/hook"),
        "https://buff.163.com".into(),
        Duration::from_secs(5),
    );

    hook.send(&WatchedItem::new("33975", "", 50.0), 49.5).await.unwrap();

    let posted = up.posted.lock().unwrap().clone();
    assert_eq!(posted.len(), 1);
    let embed = &posted[0]["embeds"][0];
    assert_eq!(embed["title"], "🚨 Price Alert: Item 33975");
    assert_eq!(embed["description"], "**Price: ¥49.5** (Target: ¥50)");
    assert_eq!(embed["url"], "https://buff.163.com/goods/33975");
}

#[tokio::test]
async fn webhook_rejection_is_a_dispatch_error() {
    let (base, _up) = start_upstream().await;
    let hook = DiscordWebhook::new(
        format!("{base}/rejecting-hook"),
        "https://buff.163.com".into(),
        Duration::from_secs(5),
    );

    let err = hook.send(&WatchedItem::new("A", "Knife", 100.0), 95.0).await.unwrap_err();
    match err {
        DispatchError::Status { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad embed");
        }
        other => panic!("unexpected error: {other}"),
    }
}
