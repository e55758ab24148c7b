//! WebSocket クライアントのセッション管理
//!
//! [`spawn_session`] はソケット、接続中のハンドシェイク、リトライ期限、キープアライブを
//! 持つタスクを起動する。タスクは通信のイベントを再接続コントローラーに渡し、返された
//! 副作用を実行する。操作は [`SessionHandle`] から行い、状態は [`ClientEvent`] で受け取る。

use std::{collections::VecDeque, future::Future, pin::Pin, time::Duration};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, Interval, MissedTickBehavior},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, protocol::Message},
};
use tsudoi_server::infrastructure::dto::websocket::{ClientMessage, ServerMessage};

use crate::{
    error::ClientError,
    reconnect::{
        ConnectionState, Effect, Event, Machine, ReconnectPolicy, RoomMembership, transition,
    },
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingConnect = Pin<Box<dyn Future<Output = Result<Socket, String>> + Send>>;

/// セッションからユーザーへの通知
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    StateChanged(ConnectionState),
    /// サーバーからのフレーム（`error` フレームを含む）
    Message(ServerMessage),
    /// 接続レベルのエラー。リトライ回数を使い切ったら `terminal`
    ConnectionError { message: String, terminal: bool },
}

#[derive(Debug)]
enum SessionCommand {
    Send(ClientMessage),
    Join(RoomMembership),
    Leave,
    Disconnect,
}

/// 実行中のセッションを操作するハンドル
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// 接続中ならフレームを送信する（未接続なら警告を出して破棄）
    pub fn send(&self, message: ClientMessage) -> Result<(), ClientError> {
        self.command(SessionCommand::Send(message))
    }

    /// ルームに参加し、再接続のたびに参加し直す
    pub fn join(&self, membership: RoomMembership) -> Result<(), ClientError> {
        self.command(SessionCommand::Join(membership))
    }

    /// 現在のルームから退出し、以後は参加し直さない
    pub fn leave(&self) -> Result<(), ClientError> {
        self.command(SessionCommand::Leave)
    }

    /// 接続を閉じ、予約中の再接続を取り消す
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.command(SessionCommand::Disconnect)
    }

    fn command(&self, command: SessionCommand) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::SessionClosed)
    }
}

/// `url` に接続し、切断されるか再接続を諦めるまで接続を維持する
///
/// セッションのタスクが終了すると、イベントの受信側は `None` を返す。
pub fn spawn_session(
    url: impl Into<String>,
    policy: ReconnectPolicy,
) -> (
    SessionHandle,
    mpsc::UnboundedReceiver<ClientEvent>,
    JoinHandle<()>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let driver = Driver {
        url: url.into(),
        policy,
        machine: Machine::default(),
        socket: None,
        connecting: None,
        retry_at: None,
        keep_alive: None,
        events: event_tx,
    };
    let task = tokio::spawn(driver.run(command_rx));

    (
        SessionHandle {
            commands: command_tx,
        },
        event_rx,
        task,
    )
}

struct Driver {
    url: String,
    policy: ReconnectPolicy,
    machine: Machine,
    socket: Option<Socket>,
    /// 実行中のハンドシェイク（run ループの select! でポーリングする）
    connecting: Option<PendingConnect>,
    retry_at: Option<Instant>,
    keep_alive: Option<Interval>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        self.apply(Event::Connect).await;

        while self.machine.state != ConnectionState::Disconnected {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Send(message)) => self.send(&message).await,
                    Some(SessionCommand::Join(membership)) => {
                        self.apply(Event::JoinRequested(membership)).await
                    }
                    Some(SessionCommand::Leave) => self.apply(Event::LeaveRequested).await,
                    Some(SessionCommand::Disconnect) | None => {
                        self.apply(Event::Disconnect).await
                    }
                },
                result = next_connect(&mut self.connecting) => {
                    self.connecting = None;
                    match result {
                        Ok(socket) => {
                            self.socket = Some(socket);
                            self.apply(Event::Opened).await;
                        }
                        Err(e) => self.apply(Event::OpenFailed(e)).await,
                    }
                }
                frame = next_frame(&mut self.socket) => self.on_frame(frame).await,
                _ = wait_until(self.retry_at) => {
                    self.retry_at = None;
                    self.apply(Event::RetryTimerFired).await;
                }
                _ = next_tick(&mut self.keep_alive) => self.send(&ClientMessage::Ping).await,
            }
        }

        tracing::info!("Session finished");
    }

    async fn on_frame(&mut self, frame: Option<Result<Message, tungstenite::Error>>) {
        match frame {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ServerMessage>(text.as_str()) {
                    Ok(message) => {
                        if let ServerMessage::Error {
                            code,
                            message: reason,
                            message_type: Some(message_type),
                            ..
                        } = &message
                            && message_type == "join-room"
                        {
                            tracing::warn!("Join rejected: {:?} {}", code, reason);
                        }
                        self.emit(ClientEvent::Message(message));
                    }
                    Err(e) => tracing::warn!("Unrecognized frame ({}): {}", e, text.as_str()),
                }
            }
            Some(Ok(Message::Close(frame))) => {
                let (code, reason) = match frame {
                    Some(frame) => (Some(u16::from(frame.code)), frame.reason.as_str().to_string()),
                    None => (None, "closed without a close frame".to_string()),
                };
                tracing::info!("Server closed the connection: {:?} {}", code, reason);
                self.socket = None;
                self.apply(Event::ConnectionLost { code, reason }).await;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::warn!("WebSocket read error: {}", e);
                self.socket = None;
                self.apply(Event::ConnectionLost {
                    code: None,
                    reason: e.to_string(),
                })
                .await;
            }
            None => {
                self.socket = None;
                self.apply(Event::ConnectionLost {
                    code: None,
                    reason: "connection closed".to_string(),
                })
                .await;
            }
        }
    }

    /// イベントをコントローラーに渡し、副作用がなくなるまで実行する
    async fn apply(&mut self, event: Event) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let jitter = self.policy.sample_jitter(&mut rand::rng());
            let (next, effects) = transition(&self.machine, event, jitter, &self.policy);

            let changed = next.state != self.machine.state;
            self.machine = next;
            if changed {
                tracing::debug!("Connection state: {:?}", self.machine.state);
                self.emit(ClientEvent::StateChanged(self.machine.state));
            }

            for effect in effects {
                if let Some(follow_up) = self.perform(effect).await {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    async fn perform(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::OpenConnection => {
                tracing::info!("Connecting to {}", self.url);
                self.connecting = Some(Box::pin(open(
                    self.url.clone(),
                    self.policy.connect_timeout,
                )));
                None
            }
            Effect::CloseConnection => {
                if self.connecting.take().is_some() {
                    tracing::debug!("Abandoned the pending handshake");
                }
                if let Some(mut socket) = self.socket.take()
                    && let Err(e) = socket.close(None).await
                {
                    tracing::debug!("Close handshake failed: {}", e);
                }
                Some(Event::Closed)
            }
            Effect::ScheduleRetry { attempt, delay } => {
                tracing::info!("Reconnecting in {:?} (attempt {})", delay, attempt);
                self.retry_at = Some(Instant::now() + delay);
                None
            }
            Effect::CancelRetry => {
                self.retry_at = None;
                None
            }
            Effect::SendJoin(membership) => {
                let message = ClientMessage::JoinRoom {
                    room_id: membership.room_id,
                    participant_name: membership.participant_name,
                    room_name: None,
                    is_publisher: Some(membership.is_publisher),
                };
                self.send(&message).await;
                None
            }
            Effect::SendLeave => {
                self.send(&ClientMessage::LeaveRoom).await;
                None
            }
            Effect::StartKeepAlive => {
                let period = self.policy.ping_interval;
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.keep_alive = Some(interval);
                None
            }
            Effect::StopKeepAlive => {
                self.keep_alive = None;
                None
            }
            Effect::ReportError { message, terminal } => {
                if terminal {
                    tracing::error!("{}", message);
                } else {
                    tracing::warn!("{}", message);
                }
                self.emit(ClientEvent::ConnectionError { message, terminal });
                None
            }
        }
    }

    /// フレームを書き込む（書き込みの失敗は受信側で検知する）
    async fn send(&mut self, message: &ClientMessage) {
        let Some(socket) = self.socket.as_mut() else {
            tracing::warn!("Not connected, dropping {}", message.type_name());
            return;
        };

        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
                return;
            }
        };

        if let Err(e) = socket.send(Message::Text(json.into())).await {
            tracing::warn!("Failed to send {}: {}", message.type_name(), e);
        }
    }

    fn emit(&self, event: ClientEvent) {
        // 受信側が閉じていても接続処理は続ける
        self.events.send(event).ok();
    }
}

async fn open(url: String, timeout: Duration) -> Result<Socket, String> {
    match tokio::time::timeout(timeout, connect_async(url.as_str())).await {
        Ok(Ok((socket, _response))) => Ok(socket),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("connection attempt timed out after {:?}", timeout)),
    }
}

async fn next_connect(connecting: &mut Option<PendingConnect>) -> Result<Socket, String> {
    match connecting {
        Some(connecting) => connecting.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn next_frame(socket: &mut Option<Socket>) -> Option<Result<Message, tungstenite::Error>> {
    match socket {
        Some(socket) => socket.next().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// TCP 接続は OS が受け付けるが、ハンドシェイクには応答しないリスナー
    async fn silent_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/collab", listener.local_addr().unwrap());
        (listener, url)
    }

    async fn next_event(events: &mut mpsc::UnboundedReceiver<ClientEvent>) -> ClientEvent {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_disconnect_during_stalled_handshake() {
        // テスト項目: ハンドシェイクが応答しないまま止まっていても disconnect で即座に終了する
        // given (前提条件):
        let (_listener, url) = silent_listener().await;
        let policy = ReconnectPolicy {
            connect_timeout: Duration::from_secs(30),
            ..ReconnectPolicy::default()
        };
        let (session, mut events, task) = spawn_session(url, policy);
        assert_eq!(
            next_event(&mut events).await,
            ClientEvent::StateChanged(ConnectionState::Connecting)
        );

        // when (操作):
        session.disconnect().unwrap();

        // then (期待する結果):
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        let mut states = Vec::new();
        while let Some(event) = events.recv().await {
            if let ClientEvent::StateChanged(state) = event {
                states.push(state);
            }
        }
        assert_eq!(
            states,
            vec![ConnectionState::Disconnecting, ConnectionState::Disconnected]
        );
    }

    #[tokio::test]
    async fn test_stalled_handshake_times_out_and_retries() {
        // テスト項目: ハンドシェイクが connect_timeout を超えると失敗として扱われ、リトライが予約される
        // given (前提条件):
        let (_listener, url) = silent_listener().await;
        let policy = ReconnectPolicy {
            connect_timeout: Duration::from_millis(100),
            base_delay: Duration::from_secs(10),
            ..ReconnectPolicy::default()
        };

        // when (操作):
        let (session, mut events, task) = spawn_session(url, policy);

        // then (期待する結果):
        assert_eq!(
            next_event(&mut events).await,
            ClientEvent::StateChanged(ConnectionState::Connecting)
        );
        assert_eq!(
            next_event(&mut events).await,
            ClientEvent::StateChanged(ConnectionState::ErrorDisconnected)
        );
        match next_event(&mut events).await {
            ClientEvent::ConnectionError { message, terminal } => {
                assert!(message.contains("timed out"), "{}", message);
                assert!(!terminal);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        session.disconnect().unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
