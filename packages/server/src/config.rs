//! Server configuration.

use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_MISSED_PINGS: u32 = 3;
pub const DEFAULT_EMPTY_ROOM_TTL: Duration = Duration::from_secs(300);

/// Runtime settings for [`crate::ui::Server`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How often the heartbeat supervisor looks for idle connections
    pub heartbeat_interval: Duration,
    /// Intervals a connection may stay silent before it is closed
    pub max_missed_pings: u32,
    /// How long a created room may stay without participants before it is deleted
    pub empty_room_ttl: Duration,
    /// Reject unknown message types instead of forwarding them
    pub strict: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            max_missed_pings: DEFAULT_MAX_MISSED_PINGS,
            empty_room_ttl: DEFAULT_EMPTY_ROOM_TTL,
            strict: false,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // テスト項目: デフォルト設定の値
        // given (前提条件):
        // when (操作):
        let config = ServerConfig::default();

        // then (期待する結果):
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.max_missed_pings, 3);
        assert_eq!(config.empty_room_ttl, Duration::from_secs(300));
        assert!(!config.strict);
    }
}
