//! Tracing subscriber initialization.
//!
//! # Usage
//!
//! ```no_run
//! use spaces_observe::tracing_setup::{default_directives, init_tracing, shutdown_tracing};
//!
//! init_tracing(default_directives(1, false), false).unwrap();
//! // ... run the command ...
//! shutdown_tracing();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use std::sync::OnceLock;

/// Instrumentation scope name reported to OpenTelemetry.
pub const TRACER_NAME: &str = "spaces";

/// Held so the provider can be flushed on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("invalid log filter '{directives}': {source}")]
    Filter {
        directives: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Filter directives for the CLI verbosity flags.
///
/// `--quiet` only applies when no `-v` was given.
pub fn default_directives(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info,spaces=debug,spaces_core=debug,spaces_infra=debug",
        _ => "trace",
    }
}

/// Build the filter: `RUST_LOG` when set and valid, else `directives`.
pub fn build_filter(directives: &str) -> Result<EnvFilter, TracingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(directives).map_err(|source| TracingError::Filter {
        directives: directives.to_string(),
        source,
    })
}

/// Install the global tracing subscriber.
///
/// The `fmt` layer writes to stderr so command output on stdout stays
/// machine-readable. With `enable_otel`, spans are also bridged to
/// OpenTelemetry through a stdout exporter, and span close timings are
/// logged.
///
/// # Errors
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_tracing(directives: &str, enable_otel: bool) -> Result<(), TracingError> {
    let env_filter = build_filter(directives)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(enable_otel)
        .with_span_events(if enable_otel {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        });

    if enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer(TRACER_NAME);
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

/// Flush buffered spans and shut down the tracer provider.
///
/// No-op when OpenTelemetry was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}
