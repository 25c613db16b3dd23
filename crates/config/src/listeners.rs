//! Inbound listener configuration
//!
//! Two listeners feed the pipeline manager besides the poll scheduler:
//! UDP sample datagrams and TCP newline-delimited notifications.

use serde::Deserialize;
use std::time::Duration;

/// All listeners; absent sections are not started
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListenersConfig {
    pub udp: Option<UdpListenerConfig>,
    pub notification: Option<NotificationListenerConfig>,
}

/// UDP sample ingestion
///
/// # Example
///
/// ```toml
/// [listeners.udp]
/// port = 4952
/// secret = "change-me"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UdpListenerConfig {
    /// Default: true
    pub enabled: bool,

    /// Default: "0.0.0.0"
    pub address: String,

    /// Default: 4952
    pub port: u16,

    /// Socket receive buffer size (bytes)
    pub buffer_size: Option<usize>,

    /// Shared secret; when set, unsigned datagrams are dropped
    pub secret: Option<String>,
}

impl Default for UdpListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "0.0.0.0".into(),
            port: 4952,
            buffer_size: None,
            secret: None,
        }
    }
}

/// Notification bus consumer
///
/// # Example
///
/// ```toml
/// [listeners.notification]
/// port = 4953
/// secret = "change-me"
/// dedup_window = "10m"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationListenerConfig {
    /// Default: true
    pub enabled: bool,

    /// Default: "0.0.0.0"
    pub address: String,

    /// Default: 4953
    pub port: u16,

    /// Shared secret used to verify message signatures
    /// Required when enabled
    pub secret: String,

    /// How long a message id is remembered for duplicate detection
    /// Default: 10m
    #[serde(with = "humantime_serde")]
    pub dedup_window: Duration,

    /// Maximum number of remembered message ids
    /// Default: 100000
    pub dedup_capacity: usize,

    /// Longest accepted message line (bytes)
    /// Default: 1MB
    pub max_message_size: usize,
}

impl Default for NotificationListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "0.0.0.0".into(),
            port: 4953,
            secret: String::new(),
            dedup_window: Duration::from_secs(600),
            dedup_capacity: 100_000,
            max_message_size: 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_listeners() {
        let config: ListenersConfig = toml::from_str("").unwrap();
        assert!(config.udp.is_none());
        assert!(config.notification.is_none());
    }

    #[test]
    fn test_defaults_when_present() {
        let toml = r#"
[udp]

[notification]
secret = "s"
"#;
        let config: ListenersConfig = toml::from_str(toml).unwrap();
        let udp = config.udp.unwrap();
        assert!(udp.enabled);
        assert_eq!(udp.port, 4952);
        assert!(udp.secret.is_none());

        let notification = config.notification.unwrap();
        assert_eq!(notification.port, 4953);
        assert_eq!(notification.dedup_window, Duration::from_secs(600));
        assert_eq!(notification.dedup_capacity, 100_000);
    }
}
