use std::collections::HashMap;

use serde::Deserialize;

/// Top-level configuration settings for the crate.
///
/// Immutable for the lifetime of an engine instance; covers the broker
/// bootstrap address and passthrough settings on one side and the engine's
/// multiplexing behavior on the other.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub engine: EngineSettings,
}

/// Where and how to reach the broker.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    /// Broker bootstrap host. When `port` is omitted the host is used alone.
    pub host: String,
    pub port: Option<u16>,

    /// Consumer group id. When unset, each engine instance generates a fresh
    /// unique id at consumer-creation time and therefore receives a full,
    /// independent copy of the topic's traffic.
    pub group_id: Option<String>,

    /// Broker-specific settings merged over the built-in defaults for both
    /// connection directions.
    pub global_config: HashMap<String, String>,

    /// Broker-specific topic-level settings, merged under a `topic.` prefix.
    pub topic_config: HashMap<String, String>,
}

/// How the engine multiplexes channels onto the physical topic.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineSettings {
    /// The single physical broker topic all channels share.
    pub topic: String,

    /// Header mode (`true`) carries the channel in a message header and
    /// leaves the body untouched; envelope mode (`false`, the default) wraps
    /// channel and payload in one JSON object body.
    pub use_headers: bool,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub engine: Option<PartialEngineSettings>,
}

/// Partial broker settings.
///
/// Used when loading broker configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub group_id: Option<String>,
    pub global_config: Option<HashMap<String, String>>,
    pub topic_config: Option<HashMap<String, String>>,
}

/// Partial engine settings.
///
/// Used for engine configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialEngineSettings {
    pub topic: Option<String>,
    pub use_headers: Option<bool>,
}

/// Provides default values for `Settings`.
///
/// Ensures the engine has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings {
                host: "127.0.0.1".to_string(),
                port: None,
                group_id: None,
                global_config: HashMap::new(),
                topic_config: HashMap::new(),
            },
            engine: EngineSettings {
                topic: "events".to_string(),
                use_headers: false,
            },
        }
    }
}
