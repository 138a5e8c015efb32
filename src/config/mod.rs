//! Layered configuration: built-in defaults, an optional `config/default`
//! file, `LISTSYNC_`-prefixed environment variables and finally the bare
//! `PORT` variable that hosting platforms assign.

mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{LogSettings, RelaySettings, ServerSettings, Settings};

/// Prefix for relay-specific environment variables, e.g. `LISTSYNC_SERVER__HOST`.
pub const ENV_PREFIX: &str = "LISTSYNC";

/// Loads the configuration and merges it field by field with the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("server.port", std::env::var("PORT").ok())?;

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merge(partial))
}
