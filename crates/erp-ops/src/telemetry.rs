//! 日誌初始化

use tracing_subscriber::EnvFilter;

/// 安裝 tracing 訂閱者（`RUST_LOG` 可覆寫，預設 `info`）
///
/// 可重複呼叫，之後的呼叫不生效。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        tracing::info!("telemetry ready");
    }
}
