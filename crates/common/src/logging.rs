//! Provides utilities to initialize logging and OpenTelemetry tracing.
use std::env;

use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use thiserror::Error;
use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding the OTLP collector endpoint.
pub const OTLP_URL_ENVVAR: &str = "PLASMA_OTLP_URL";

/// Environment variable name for the service label, which is appended to the
/// whoami string.
pub const SVC_LABEL_ENVVAR: &str = "PLASMA_SVC_LABEL";

/// Setting this to `1` adds the source file to every log line.
pub const LOG_FILE_ENVVAR: &str = "LOG_FILE";

/// Setting this to `1` adds the source line number to every log line.
pub const LOG_LINE_NUM_ENVVAR: &str = "LOG_LINE_NUM";

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The OTLP span exporter could not be built.
    #[error("could not build otlp exporter: {0}")]
    Exporter(String),

    /// A global subscriber was already installed.
    #[error("could not install subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Configuration for the logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// The whoami string, which is used to identify the service in logs.
    whoami: String,

    /// The OpenTelemetry URL for exporting traces.
    otel_url: Option<String>,

    with_file: bool,

    with_line_number: bool,
}

impl LoggerConfig {
    /// Creates a new instance with whoami set and nothing else enabled.
    pub const fn new(whoami: String) -> Self {
        Self {
            whoami,
            otel_url: None,
            with_file: false,
            with_line_number: false,
        }
    }

    /// Creates a new instance with the whoami string derived from `base` and the remaining
    /// settings read from the environment.
    pub fn from_env(base: &str) -> Self {
        let flag = |var: &str| env::var(var).is_ok_and(|v| v == "1");

        Self {
            whoami: get_whoami_string(base),
            otel_url: get_otlp_url_from_env(),
            with_file: flag(LOG_FILE_ENVVAR),
            with_line_number: flag(LOG_LINE_NUM_ENVVAR),
        }
    }

    /// Sets the opentelemetry URL to the provided string.
    pub fn with_otlp_url(self, url: impl Into<String>) -> Self {
        Self {
            otel_url: Some(url.into()),
            ..self
        }
    }

    /// The identity reported in logs and traces.
    pub fn whoami(&self) -> &str {
        &self.whoami
    }

    /// The collector that traces are exported to, if any.
    pub fn otel_url(&self) -> Option<&str> {
        self.otel_url.as_deref()
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::from_env("plasma-operator")
    }
}

/// Initializes the logging subsystem with the provided config.
///
/// Log levels are taken from `RUST_LOG` and default to `info`.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_sub = tracing_subscriber::fmt::layer()
        .compact()
        .event_format(
            tracing_subscriber::fmt::format()
                .with_file(config.with_file)
                .with_line_number(config.with_line_number),
        )
        .with_filter(filter);

    if let Some(otel_url) = &config.otel_url {
        let resource = Resource::builder()
            .with_attribute(KeyValue::new("service.name", config.whoami.clone()))
            .build();

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(otel_url)
            .build()
            .map_err(|e| LoggingError::Exporter(e.to_string()))?;

        let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_resource(resource)
            .with_batch_exporter(exporter)
            .build();

        let otel_sub = tracing_opentelemetry::layer().with_tracer(provider.tracer("plasma"));

        tracing_subscriber::registry()
            .with(stdout_sub)
            .with(otel_sub)
            .try_init()?;
    } else {
        tracing_subscriber::registry().with(stdout_sub).try_init()?;
    }

    info!(whoami = %config.whoami, otel = config.otel_url.is_some(), "logging started");

    Ok(())
}

/// Gets the OTLP URL from the standard envvar.
pub fn get_otlp_url_from_env() -> Option<String> {
    env::var(OTLP_URL_ENVVAR).ok()
}

/// Gets the service label from the standard envvar, which should be included
/// in the whoami string.
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// Computes a standard whoami string.
pub fn get_whoami_string(base: &str) -> String {
    whoami_with_label(base, get_service_label_from_env().as_deref())
}

fn whoami_with_label(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_appended_to_whoami() {
        assert_eq!(whoami_with_label("plasma-operator", None), "plasma-operator");
        assert_eq!(
            whoami_with_label("plasma-operator", Some("eu-1")),
            "plasma-operator%eu-1"
        );
    }

    #[test]
    fn otlp_url_is_opt_in() {
        let config = LoggerConfig::new("op".to_string());
        assert_eq!(config.otel_url(), None);

        let config = config.with_otlp_url("http://localhost:4317");
        assert_eq!(config.otel_url(), Some("http://localhost:4317"));
        assert_eq!(config.whoami(), "op");
    }
}
