//! Configuration for synchronizer behavior.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default quiescence window before a conversation-list reload.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Configuration shared by both synchronizers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet time after the last list-change event before reloading.
    #[serde(with = "millis", rename = "debounce_window_ms")]
    pub debounce_window: Duration,
    /// Mark a conversation read after its messages load.
    pub mark_read_on_load: bool,
    /// Look up display names for unseen senders.
    pub resolve_names: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            mark_read_on_load: true,
            resolve_names: true,
        }
    }
}

impl SyncConfig {
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    pub fn with_mark_read_on_load(mut self, enabled: bool) -> Self {
        self.mark_read_on_load = enabled;
        self
    }

    pub fn with_resolve_names(mut self, enabled: bool) -> Self {
        self.resolve_names = enabled;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.debounce_window, Duration::from_millis(500));
        assert!(config.mark_read_on_load);
        assert!(config.resolve_names);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{"debounce_window_ms": 250}"#).unwrap();
        assert_eq!(config.debounce_window, Duration::from_millis(250));
        assert!(config.mark_read_on_load);
    }
}
