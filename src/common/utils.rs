//! Utility functions for kv2pc

use uuid::Uuid;

/// Turn a node address into the base URL of its HTTP API.
///
/// Accepts `host:port` (the bootstrap format) or an explicit
/// `http://`/`https://` URL. A trailing slash is dropped.
pub fn node_url(addr: &str) -> crate::Result<String> {
    let addr = addr.trim().trim_end_matches('/');
    if addr.starts_with("http://") || addr.starts_with("https://") {
        return Ok(addr.to_string());
    }

    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| crate::Error::InvalidAddress(addr.to_string()))?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(crate::Error::InvalidAddress(addr.to_string()));
    }

    Ok(format!("http://{}:{}", host, port))
}

/// Parse duration string (e.g., "30s", "5m", "1h", "7d")
pub fn parse_duration(s: &str) -> crate::Result<std::time::Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(crate::Error::InvalidConfig("empty duration".into()));
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| crate::Error::InvalidConfig(format!("missing duration unit: {}", s)))?;
    let (num_str, unit) = s.split_at(split);

    let num: u64 = num_str
        .parse()
        .map_err(|_| crate::Error::InvalidConfig(format!("invalid duration: {}", s)))?;

    if unit == "ms" {
        return Ok(std::time::Duration::from_millis(num));
    }
    let scale: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => {
            return Err(crate::Error::InvalidConfig(format!(
                "unknown duration unit: {}",
                unit
            )))
        }
    };
    let secs = num
        .checked_mul(scale)
        .ok_or_else(|| crate::Error::InvalidConfig(format!("duration too large: {}", s)))?;

    Ok(std::time::Duration::from_secs(secs))
}

/// Resolves on Ctrl-C, used for graceful server shutdown
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Generate a unique id for one client transaction
pub fn generate_transaction_id() -> String {
    Uuid::new_v4().to_string()
}
