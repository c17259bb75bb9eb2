//! Application-wide structured logging.
//!
//! Logs are emitted as Bunyan-formatted JSON, with span fields carried into
//! every event by [`JsonStorageLayer`]. `RUST_LOG` overrides the default
//! filter; records from crates using the `log` facade are bridged in via
//! [`LogTracer`].

use tracing::{Subscriber, subscriber::set_global_default};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, fmt::MakeWriter, layer::SubscriberExt};

/// Composes the subscriber without installing it.
///
/// # Parameters
/// - `name`: service name recorded in every log line
/// - `env_filter`: filter used when `RUST_LOG` is unset, e.g. `"info"`
/// - `sink`: where formatted lines are written (`std::io::stdout`, or
///   `std::io::sink` in tests)
///
/// # Example
/// ```rust
/// use deepfake_server::{get_subscriber, init_subscriber};
///
/// let subscriber = get_subscriber("deepfake".into(), "info".into(), std::io::stdout);
/// init_subscriber(subscriber).expect("logging initialised once");
/// ```
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{env_filter},actix_server=info,hyper=warn,sqlx=warn"))
    });
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Installs `subscriber` as the global default and bridges `log` records.
///
/// # Errors
/// Fails if a logger or subscriber was already installed.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> anyhow::Result<()> {
    LogTracer::init()?;
    set_global_default(subscriber)?;
    Ok(())
}
