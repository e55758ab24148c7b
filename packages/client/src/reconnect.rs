//! 再接続コントローラー
//!
//! 副作用を持たない状態機械。[`transition`] は現在の [`Machine`]、[`Event`]、ジッター係数を
//! 受け取り、次の状態とセッションが実行すべき [`Effect`] を返す。タイマーやソケットは持たない。
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> ErrorDisconnected -> Reconnecting -> Connected
//!                                   |                                  |
//!                                   +--> Disconnecting -> Disconnected <+
//! ```

use std::{ops::RangeInclusive, time::Duration};

use rand::Rng;

/// ユーザーから見た接続状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    /// 接続が切れ、リトライを予約済み
    ErrorDisconnected,
    /// リトライ中
    Reconnecting,
}

/// 正常終了を表す WebSocket の close code
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// 再接続とキープアライブの設定
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
    /// `max_attempts` 回失敗した後に 1 度だけ行う最終リトライまでの待ち時間
    pub last_chance_delay: Duration,
    pub ping_interval: Duration,
    /// TCP 接続と WebSocket ハンドシェイクにかけられる時間の上限
    pub connect_timeout: Duration,
    pub jitter: RangeInclusive<f64>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
            last_chance_delay: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            jitter: 0.85..=1.15,
        }
    }
}

impl ReconnectPolicy {
    /// 設定された範囲からジッター係数を引く
    pub fn sample_jitter<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.random_range(self.jitter.clone())
    }

    /// `attempt` 回目（1 始まり）のリトライまでの待ち時間:
    /// `min(base * 2^(attempt - 1) * jitter, max_delay)`
    pub fn backoff_delay(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let millis = self.base_delay.as_millis() as f64 * 2f64.powi(exponent) * jitter;
        let capped = millis.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped.round() as u64)
    }
}

/// 参加を要求したルーム（再接続のたびに送り直す）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMembership {
    pub room_id: String,
    pub participant_name: Option<String>,
    pub is_publisher: bool,
}

/// 状態機械への入力
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// ユーザーが接続を要求
    Connect,
    /// 接続が確立した
    Opened,
    /// 接続を確立できなかった
    OpenFailed(String),
    /// 接続中に切断された、またはエラーが起きた
    ConnectionLost { code: Option<u16>, reason: String },
    /// ユーザーが切断を要求
    Disconnect,
    /// 切断要求後にソケットのクローズが完了した
    Closed,
    RetryTimerFired,
    JoinRequested(RoomMembership),
    LeaveRequested,
}

/// セッションが順に実行する副作用
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    OpenConnection,
    CloseConnection,
    ScheduleRetry { attempt: u32, delay: Duration },
    CancelRetry,
    SendJoin(RoomMembership),
    SendLeave,
    StartKeepAlive,
    StopKeepAlive,
    /// ユーザーに通知する接続エラー。リトライ回数を使い切ったら `terminal`
    ReportError { message: String, terminal: bool },
}

/// コントローラーの状態
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    pub state: ConnectionState,
    /// 最後に接続に成功してからの失敗回数
    pub attempt: u32,
    pub last_chance_used: bool,
    pub room: Option<RoomMembership>,
}

impl Default for Machine {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt: 0,
            last_chance_used: false,
            room: None,
        }
    }
}

/// 次の状態と副作用を計算する
pub fn transition(
    machine: &Machine,
    event: Event,
    jitter: f64,
    policy: &ReconnectPolicy,
) -> (Machine, Vec<Effect>) {
    use ConnectionState::*;

    let mut next = machine.clone();
    let mut effects = Vec::new();

    match (machine.state, event) {
        (_, Event::JoinRequested(membership)) => {
            if machine.state == Connected {
                effects.push(Effect::SendJoin(membership.clone()));
            }
            next.room = Some(membership);
        }
        (_, Event::LeaveRequested) => {
            if machine.state == Connected && machine.room.is_some() {
                effects.push(Effect::SendLeave);
            }
            next.room = None;
        }

        (Disconnected, Event::Connect) => {
            next.state = Connecting;
            next.attempt = 0;
            next.last_chance_used = false;
            effects.push(Effect::OpenConnection);
        }

        (Connecting | Reconnecting, Event::Opened) => {
            next.state = Connected;
            next.attempt = 0;
            next.last_chance_used = false;
            effects.push(Effect::StartKeepAlive);
            if let Some(room) = &machine.room {
                effects.push(Effect::SendJoin(room.clone()));
            }
        }
        (Connecting | Reconnecting, Event::OpenFailed(reason)) => {
            schedule_retry(&mut next, &mut effects, reason, jitter, policy);
        }

        (Connected, Event::ConnectionLost { code, reason }) => {
            effects.push(Effect::StopKeepAlive);
            if code == Some(NORMAL_CLOSE_CODE) {
                next.state = Disconnected;
            } else {
                schedule_retry(&mut next, &mut effects, reason, jitter, policy);
            }
        }

        (ErrorDisconnected, Event::RetryTimerFired) => {
            next.state = Reconnecting;
            effects.push(Effect::OpenConnection);
        }

        (Connected | Connecting | Reconnecting, Event::Disconnect) => {
            next.state = Disconnecting;
            if machine.state == Connected {
                effects.push(Effect::StopKeepAlive);
            }
            effects.push(Effect::CloseConnection);
        }
        (ErrorDisconnected, Event::Disconnect) => {
            next.state = Disconnected;
            effects.push(Effect::CancelRetry);
        }
        (Disconnecting, Event::Closed | Event::ConnectionLost { .. } | Event::OpenFailed(_)) => {
            next.state = Disconnected;
        }
        // 切断要求中に開いた接続はそのまま閉じる
        (Disconnecting, Event::Opened) => {
            effects.push(Effect::CloseConnection);
        }

        (state, event) => {
            tracing::debug!("Ignoring {:?} in state {:?}", event, state);
        }
    }

    (next, effects)
}

fn schedule_retry(
    next: &mut Machine,
    effects: &mut Vec<Effect>,
    reason: String,
    jitter: f64,
    policy: &ReconnectPolicy,
) {
    let attempt = next.attempt + 1;

    if attempt <= policy.max_attempts {
        next.attempt = attempt;
        next.state = ConnectionState::ErrorDisconnected;
        effects.push(Effect::ReportError {
            message: reason,
            terminal: false,
        });
        effects.push(Effect::ScheduleRetry {
            attempt,
            delay: policy.backoff_delay(attempt, jitter),
        });
    } else if !next.last_chance_used {
        next.attempt = attempt;
        next.last_chance_used = true;
        next.state = ConnectionState::ErrorDisconnected;
        effects.push(Effect::ReportError {
            message: format!(
                "Reconnection failed after {} attempts ({}); retrying once more in {}s",
                policy.max_attempts,
                reason,
                policy.last_chance_delay.as_secs()
            ),
            terminal: true,
        });
        effects.push(Effect::ScheduleRetry {
            attempt,
            delay: policy.last_chance_delay,
        });
    } else {
        next.state = ConnectionState::Disconnected;
        effects.push(Effect::ReportError {
            message: format!("Giving up reconnecting: {}", reason),
            terminal: true,
        });
    }
}
