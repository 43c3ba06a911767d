//! Local stand-ins for the model and search APIs, served over real sockets.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

type Replies = Arc<Mutex<VecDeque<(u16, String)>>>;

/// Chat-completions endpoint that answers with queued replies in order.
///
/// A 200 reply's text becomes the assistant message content; any other
/// status is returned with the text as the raw body.
pub async fn mock_model(replies: Vec<(u16, &str)>) -> String {
    let queue: Replies = Arc::new(Mutex::new(
        replies.into_iter().map(|(s, b)| (s, b.to_string())).collect(),
    ));
    let router = Router::new()
        .route("/v1/chat/completions", post(chat_reply))
        .with_state(queue);
    format!("{}/v1", spawn(router).await)
}

async fn chat_reply(State(queue): State<Replies>) -> (StatusCode, String) {
    let (status, text) = queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((500, "no reply queued".to_string()));
    if status == 200 {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": text } }],
            "usage": { "total_tokens": 17 }
        });
        (StatusCode::OK, body.to_string())
    } else {
        (StatusCode::from_u16(status).unwrap(), text)
    }
}

/// Search endpoint that always answers with `status` and `body`.
pub async fn mock_search(status: u16, body: Value) -> String {
    let router = Router::new().route(
        "/search",
        post(move || {
            let body = body.clone();
            async move { (StatusCode::from_u16(status).unwrap(), Json(body)) }
        }),
    );
    spawn(router).await
}
