use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::broadcast::message::ListenerEvent;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route("/ws/broadcast", get(broadcaster))
        .route("/ws/listen", get(listener))
}

/// Control messages sent by the broadcaster client. Audio fragments arrive
/// as separate binary frames.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
enum BroadcasterMessage {
    #[serde(rename = "start_broadcast")]
    Start {
        title: String,
        date: String,
        #[serde(rename = "startTime")]
        start_time: String,
    },
    #[serde(rename = "stop_broadcast")]
    Stop {
        #[serde(rename = "endTime")]
        end_time: String,
    },
    #[serde(rename = "force_stop_broadcast")]
    ForceStop,
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data")]
enum ListenerMessage<'a> {
    #[serde(rename = "broadcast_started")]
    Started { title: &'a str },
    #[serde(rename = "broadcast_stopped")]
    Stopped,
}

impl ListenerMessage<'_> {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

async fn broadcaster(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_broadcaster(socket, state))
}

async fn handle_broadcaster(mut socket: WebSocket, state: AppState) {
    info!("broadcaster connected");
    let mut live = false;
    while let Some(msg) = socket.recv().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                debug!("broadcaster socket error: {}", e);
                break;
            }
        };
        match msg {
            Message::Binary(data) => state.session.ingest(Bytes::from(data)).await,
            Message::Text(text) => match serde_json::from_str::<BroadcasterMessage>(&text) {
                Ok(BroadcasterMessage::Start {
                    title,
                    date,
                    start_time,
                }) => match state.session.start(&title, &date, &start_time).await {
                    Ok(_) => live = true,
                    Err(e) => error!("start broadcast failed: {}", e),
                },
                Ok(BroadcasterMessage::Stop { end_time }) => {
                    state.session.stop(&end_time).await;
                    live = false;
                }
                Ok(BroadcasterMessage::ForceStop) => {
                    state.session.force_stop().await;
                    live = false;
                }
                Err(e) => warn!("unrecognized broadcaster message: {}", e),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    if live {
        // connection lost without a clean stop
        warn!("broadcaster disconnected mid-broadcast, forcing stop");
        state.session.force_stop().await;
    } else {
        info!("broadcaster disconnected");
    }
}

async fn listener(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_listener(socket, state))
}

async fn handle_listener(socket: WebSocket, state: AppState) {
    debug!("listener connected");
    let (mut tx, mut rx) = socket.split();

    // a listener joining mid-broadcast still learns what is on air; earlier
    // fragments are missed by design
    match state.catalog.find_live() {
        Ok(Some(rec)) => {
            let snapshot = ListenerMessage::Started { title: &rec.title }.to_json();
            if tx.send(Message::Text(snapshot)).await.is_err() {
                return;
            }
        }
        Ok(None) => {}
        Err(e) => warn!("live broadcast lookup failed: {}", e),
    }

    let mut events = state.session.subscribe();
    loop {
        tokio::select! {
            event = events.recv() => {
                let out = match event {
                    Ok(ListenerEvent::Audio(data)) => Message::Binary(data.to_vec()),
                    Ok(ListenerEvent::Started { title }) => {
                        Message::Text(ListenerMessage::Started { title: &title }.to_json())
                    }
                    Ok(ListenerEvent::Stopped) => {
                        Message::Text(ListenerMessage::Stopped.to_json())
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!("slow listener dropped {} events", n);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if tx.send(out).await.is_err() {
                    break;
                }
            }
            msg = rx.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("listener disconnected");
}
