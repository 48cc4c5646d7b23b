use crate::{errors::ApiError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

/// Default filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn setup_logging(format: &str) -> Result<()> {
    // Stdout layer, json for log shippers and text for local runs
    let stdout_layer = match LogFormat::parse(format) {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stdout)
            .boxed(),
        LogFormat::Text => fmt::layer().with_writer(std::io::stdout).boxed(),
    };

    let subscriber = Registry::default().with(stdout_layer).with(env_filter());

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ApiError::Custom(format!("Failed to set global default subscriber: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
    }
}
