//! Logging and tracing bootstrap.

use bookstore_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{fmt, EnvFilter};

/// Build the env filter: `RUST_LOG` wins, otherwise the configured level.
fn env_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.log_level).map_err(|e| {
            anyhow::anyhow!("invalid log level '{}': {}", settings.log_level, e)
        }),
    }
}

/// Install the global tracing subscriber.
///
/// A subscriber that is already installed (tests, embedding binaries) is left in place.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = env_filter(settings)?;

    let installed = match settings.log_format {
        LogFormat::Pretty => fmt().with_env_filter(filter).with_target(true).try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!(target: "bookstore-telemetry", "tracing subscriber already installed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_is_reported() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let settings = TelemetrySettings {
            log_format: LogFormat::Pretty,
            log_level: "bookstore=loud".to_string(),
        };
        assert!(init(&settings).is_err());
    }

    #[test]
    fn init_twice_is_harmless() {
        let settings = TelemetrySettings::default();
        init(&settings).unwrap();
        init(&settings).unwrap();
    }
}
