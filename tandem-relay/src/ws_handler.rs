use crate::frame::{ClientFrame, ServerFrame};
use crate::hub::{Membership, RelayHub};
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use tandem_core::{ParticipantId, RoomId};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub fn router(hub: RelayHub) -> Router {
    Router::new()
        .route("/rooms/{room_id}/ws/{participant_id}", get(ws_handler))
        .with_state(hub)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((room_id, participant_id)): Path<(String, String)>,
    State(hub): State<RelayHub>,
) -> impl IntoResponse {
    let room_id = RoomId::from(room_id);
    let participant_id = ParticipantId::from(participant_id);

    ws.on_upgrade(move |socket| handle_socket(socket, room_id, participant_id, hub))
}

async fn handle_socket(
    socket: WebSocket,
    room_id: RoomId,
    participant_id: ParticipantId,
    hub: RelayHub,
) {
    info!("New WebSocket connection: {} in {}", participant_id, room_id);

    let Membership {
        is_host,
        record,
        mut signals,
        mut notices,
    } = match hub.join(&room_id, &participant_id).await {
        Ok(membership) => membership,
        Err(e) => {
            error!("Could not join {} to {}: {}", participant_id, room_id, e);
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let _ = tx.send(ServerFrame::Welcome {
        participant_id: participant_id.clone(),
        is_host,
        record,
    });

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut fanout_task = tokio::spawn({
        let tx = tx.clone();
        let participant_id = participant_id.clone();

        async move {
            loop {
                let frame = tokio::select! {
                    signal = signals.recv() => match signal {
                        Some(message) => ServerFrame::Signal(message),
                        None => break,
                    },
                    notice = notices.recv() => match notice {
                        Ok(record) => ServerFrame::RecordChanged(record),
                        Err(RecvError::Lagged(missed)) => {
                            warn!("{} missed {} record changes", participant_id, missed);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    },
                };
                if tx.send(frame).is_err() {
                    break;
                }
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let hub = hub.clone();
        let room_id = room_id.clone();
        let participant_id = participant_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        let reply = match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(frame) => hub.handle_frame(&room_id, &participant_id, frame).await,
                            Err(e) => Err(e.into()),
                        };

                        let reply = match reply {
                            Ok(Some(frame)) => frame,
                            Ok(None) => continue,
                            Err(e) => {
                                warn!("Rejected frame from {}: {}", participant_id, e);
                                ServerFrame::Error {
                                    message: e.to_string(),
                                }
                            }
                        };
                        if tx.send(reply).is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            fanout_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
            fanout_task.abort();
        }
        _ = (&mut fanout_task) => {
            send_task.abort();
            recv_task.abort();
        }
    };

    hub.leave(&room_id, &participant_id);
    info!("WebSocket disconnected: {} from {}", participant_id, room_id);
}
