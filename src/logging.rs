use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use color_eyre::Result;
use color_eyre::eyre::Context;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

pub const SERVICE_NAME: &str = "m3u-spotify-sync";

pub struct LoggingOptions<'a> {
    pub console_level: LevelFilter,
    pub log_file: Option<&'a Path>,
    pub file_level: LevelFilter,
    pub otlp_endpoint: Option<&'a str>,
}

/// Console filter: the chosen level for this crate, warnings only for the HTTP stack.
fn console_filter(level: LevelFilter) -> Result<EnvFilter> {
    if let Ok(from_env) = std::env::var(EnvFilter::DEFAULT_ENV) {
        return EnvFilter::try_new(from_env).wrap_err("Failed to parse RUST_LOG");
    }
    EnvFilter::try_new(format!(
        "warn,{}={}",
        env!("CARGO_CRATE_NAME"),
        level.to_string().to_lowercase()
    ))
    .wrap_err("Failed to create tracing filter")
}

fn otlp_provider(endpoint: &str) -> Result<SdkTracerProvider> {
    let resource = Resource::builder()
        .with_attributes(vec![KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_NAME,
            SERVICE_NAME,
        )])
        .build();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .wrap_err("Failed to create OTLP span exporter")?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();
    opentelemetry::global::set_tracer_provider(provider.clone());
    Ok(provider)
}

/// Installs the global subscriber. `log` records are bridged into it too.
///
/// The returned provider must be shut down before exit so buffered spans get flushed.
pub fn setup_logging(options: LoggingOptions<'_>) -> Result<Option<SdkTracerProvider>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time()
        .with_filter(console_filter(options.console_level)?);

    let file_layer = match options.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(options.file_level),
            )
        }
        None => None,
    };

    let (telemetry_layer, tracer_provider) = match options.otlp_endpoint {
        Some(endpoint) => {
            let provider = otlp_provider(endpoint)?;
            let tracer = provider.tracer(SERVICE_NAME);
            (
                Some(
                    tracing_opentelemetry::layer()
                        .with_tracer(tracer)
                        .with_filter(LevelFilter::INFO),
                ),
                Some(provider),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(telemetry_layer)
        .try_init()
        .wrap_err("Failed to install tracing subscriber")?;

    Ok(tracer_provider)
}
