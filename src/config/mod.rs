mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, EngineSettings, Settings};

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the broker and engine configurations
///
/// Environment variables use a double-underscore separator so multi-word
/// fields stay addressable: `BROKER__HOST`, `BROKER__GROUP_ID`,
/// `ENGINE__USE_HEADERS`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("__"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        broker: BrokerSettings {
            host: partial
                .broker
                .as_ref()
                .and_then(|b| b.host.clone())
                .unwrap_or(default.broker.host),
            port: partial
                .broker
                .as_ref()
                .and_then(|b| b.port)
                .or(default.broker.port),
            group_id: partial
                .broker
                .as_ref()
                .and_then(|b| b.group_id.clone())
                .or(default.broker.group_id),
            global_config: partial
                .broker
                .as_ref()
                .and_then(|b| b.global_config.clone())
                .unwrap_or(default.broker.global_config),
            topic_config: partial
                .broker
                .as_ref()
                .and_then(|b| b.topic_config.clone())
                .unwrap_or(default.broker.topic_config),
        },
        engine: EngineSettings {
            topic: partial
                .engine
                .as_ref()
                .and_then(|e| e.topic.clone())
                .unwrap_or(default.engine.topic),
            use_headers: partial
                .engine
                .as_ref()
                .and_then(|e| e.use_headers)
                .unwrap_or(default.engine.use_headers),
        },
    })
}
