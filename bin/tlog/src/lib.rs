//! Process wide setup shared by the `tlog` binary modes.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default initialization of logging.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn initialize_logging(level: tracing::Level) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},hyper=info,jsonrpsee_server=info,jsonrpsee_http_client=info",
            level.as_str().to_ascii_lowercase()
        ))
    });
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();
    log_panics::init();
}
