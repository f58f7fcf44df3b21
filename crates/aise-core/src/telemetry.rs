use tracing_subscriber::EnvFilter;

use crate::{AiseError, AiseResult, LoggingConfig};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides `config.level`. Fails if a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> AiseResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AiseError::Config(format!("invalid log filter: {e}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| AiseError::Config(format!("tracing already initialised: {e}")))
}
