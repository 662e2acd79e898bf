use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{AppState, HabitDto, ProgressDto};

/// Change events pushed to a user's connected sessions. The payload
/// mirrors the REST resource that was just mutated so receivers can
/// reconcile their local view without a re-fetch.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ChangeEvent {
    HabitCreated { habit: HabitDto },
    HabitUpdated { habit: HabitDto },
    HabitDeleted { id: i32 },
    ProgressSaved { progress: ProgressDto },
    ProgressUpdated { progress: ProgressDto },
    ProgressDeleted { id: i32 },
}

/// First frame a client sends after the upgrade, announcing which user's
/// channel it joins. A bare integer body is accepted too.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Announcement {
    user_id: i32,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let Some(user_id) = await_announcement(&mut socket).await else {
        debug!("WebSocket closed before announcing a user id");
        return;
    };

    let mut rx = state.notifier().subscribe(user_id);
    debug!("WebSocket session joined channel for user {user_id}");

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!("WebSocket client for user {user_id} lagged by {count} events");
                    let notice = r#"{"type":"warning","payload":"Missed some events"}"#;
                    if socket.send(Message::Text(notice.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Inbound frames after the announcement carry no meaning.
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("WebSocket session for user {user_id} closed");
}

/// Reads frames until a user id announcement arrives; `None` when the
/// socket closes first.
async fn await_announcement(socket: &mut WebSocket) -> Option<i32> {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(text) => {
                if let Some(user_id) = parse_announcement(text.as_str()) {
                    return Some(user_id);
                }
                debug!("Ignoring unparseable announcement frame");
            }
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

fn parse_announcement(text: &str) -> Option<i32> {
    if let Ok(announcement) = serde_json::from_str::<Announcement>(text) {
        return (announcement.user_id > 0).then_some(announcement.user_id);
    }
    text.trim().parse::<i32>().ok().filter(|id| *id > 0)
}
