//! Logging setup utilities for the collaboration server and client.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose log output is enabled by the default filter.
const WORKSPACE_CRATES: [&str; 3] = ["tsudoi_shared", "tsudoi_server", "tsudoi_client"];

/// Initialize the tracing subscriber with the specified default log level.
///
/// The default filter enables every workspace crate and the binary itself at
/// `default_log_level`. The filter can be overridden with the `RUST_LOG`
/// environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "tsudoi-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use tsudoi_shared::logger::setup_logger;
///
/// setup_logger("tsudoi-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the `EnvFilter` directive string used when `RUST_LOG` is unset.
pub fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    WORKSPACE_CRATES
        .iter()
        .copied()
        .chain(std::iter::once(binary_name))
        .map(|target| format!("{}={}", target.replace('-', "_"), default_log_level))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_includes_workspace_crates_and_binary() {
        // テスト項目: デフォルトフィルタにワークスペースの全クレートとバイナリが含まれる
        // given (前提条件):
        let binary_name = "tsudoi-server";

        // when (操作):
        let filter = default_filter(binary_name, "debug");

        // then (期待する結果):
        assert_eq!(
            filter,
            "tsudoi_shared=debug,tsudoi_server=debug,tsudoi_client=debug,tsudoi_server=debug"
        );
    }

    #[test]
    fn test_default_filter_replaces_hyphen_in_binary_name() {
        // テスト項目: バイナリ名のハイフンがアンダースコアに置換される
        // given (前提条件):
        let binary_name = "my-tool";

        // when (操作):
        let filter = default_filter(binary_name, "info");

        // then (期待する結果):
        assert!(filter.ends_with("my_tool=info"));
        assert!(!filter.contains("my-tool"));
    }
}
