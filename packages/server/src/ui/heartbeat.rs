//! Heartbeat supervisor.
//!
//! Periodically closes connections that have not sent any frame for
//! `interval * max_missed_pings`, and deletes rooms that were created but
//! stayed empty for longer than `empty_room_ttl`.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};

use super::state::AppState;

/// Spawn the supervisor task; it runs until aborted
pub fn spawn_heartbeat_supervisor(
    state: Arc<AppState>,
    interval: Duration,
    max_missed_pings: u32,
    empty_room_ttl: Duration,
) -> JoinHandle<()> {
    let max_idle_millis = max_idle_millis(interval, max_missed_pings);
    let empty_room_ttl_millis = i64::try_from(empty_room_ttl.as_millis()).unwrap_or(i64::MAX);
    tracing::info!(
        "Heartbeat supervisor started (interval: {:?}, max idle: {}ms, empty room ttl: {:?})",
        interval,
        max_idle_millis,
        empty_room_ttl
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 最初の tick は即座に完了する
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = state.heartbeat_usecase.evict_stale(max_idle_millis).await;
            if !evicted.is_empty() {
                tracing::info!("Evicted {} unresponsive connection(s)", evicted.len());
            }
            let swept = state
                .heartbeat_usecase
                .sweep_empty_rooms(empty_room_ttl_millis)
                .await;
            if !swept.is_empty() {
                tracing::info!("Deleted {} abandoned room(s)", swept.len());
            }
        }
    })
}

fn max_idle_millis(interval: Duration, max_missed_pings: u32) -> i64 {
    let millis = interval.as_millis().saturating_mul(u128::from(max_missed_pings.max(1)));
    i64::try_from(millis).unwrap_or(i64::MAX)
}
