//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::sync::{mpsc, watch};

use crate::{
    domain::Outbound,
    infrastructure::dto::{conversion::error_frame, websocket::ServerMessage},
    ui::{
        router::{handle_frame, notify_participant_left, reply},
        state::AppState,
    },
    usecase::CollabError,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that receives frames from the rx channel and writes them to the WebSocket.
///
/// A `Outbound::Close` request (sent by the heartbeat supervisor) ends the task after
/// sending a close frame.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let frame = CloseFrame {
                        code: close_code::AWAY,
                        reason: "keep-alive timeout".into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (tx, rx) = mpsc::unbounded_channel();

    // Use ConnectParticipantUseCase to register the connection
    // (register_client is called inside the UseCase)
    let record = match state.connect_participant_usecase.execute(tx).await {
        Ok(record) => record,
        Err(e) => {
            tracing::error!("Failed to register connection: {}", e);
            return;
        }
    };
    let client_id = record.client_id;
    tracing::info!("Client '{}' connected", client_id);

    let (sender, mut receiver) = socket.split();
    let mut send_task = pusher_loop(rx, sender);

    // 払い出した ID を本人に通知
    let connected = ServerMessage::Connected {
        client_id: client_id.as_str().to_string(),
        timestamp: state.now_millis(),
    };
    reply(&state, &client_id, &connected).await;

    let state_clone = state.clone();
    let client_id_clone = client_id.clone();
    let (stop_tx, mut stop_rx) = watch::channel(false);

    // Spawn a task to receive frames from this client; frames are handled one at a time.
    // The loop only stops between frames so a frame is never abandoned half-applied.
    let mut recv_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                msg = receiver.next() => msg,
                _ = stop_rx.changed() => break,
            };
            let Some(msg) = msg else { break };
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error from '{}': {}", client_id_clone, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_frame(&state_clone, &client_id_clone, text.as_str()).await;
                }
                Message::Binary(_) => {
                    state_clone
                        .heartbeat_usecase
                        .record_activity(&client_id_clone)
                        .await;
                    let error = CollabError::InvalidMessageFormat(
                        "binary frames are not supported".to_string(),
                    );
                    let frame = error_frame(&error, None, state_clone.now_millis());
                    reply(&state_clone, &client_id_clone, &frame).await;
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                    state_clone
                        .heartbeat_usecase
                        .record_activity(&client_id_clone)
                        .await;
                }
                Message::Close(_) => {
                    tracing::info!("Client '{}' requested close", client_id_clone);
                    break;
                }
            }
        }
    });

    // When the writer ends first, ask the reader to stop and wait for the frame in flight
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => {
            let _ = stop_tx.send(true);
            if let Err(e) = recv_task.await {
                tracing::error!("Receive task for '{}' failed: {}", client_id, e);
            }
        }
    };

    // Use DisconnectParticipantUseCase to handle disconnection
    if let Some(outcome) = state.disconnect_participant_usecase.execute(&client_id).await {
        notify_participant_left(&state, &outcome).await;
    }
    tracing::info!("Client '{}' disconnected", client_id);
}
