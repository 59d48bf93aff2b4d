//! Tracing setup for driver binaries and tests.

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable enabling log output in tests.
const ENABLE_TRACING_ENV_NAME: &str = "ENABLE_TRACING";

/// Filter applied when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

static INIT_TEST_TRACING: Once = Once::new();

/// Installs the global tracing subscriber of a binary.
///
/// Events are filtered with `RUST_LOG`, falling back to `info` for the whole process and
/// `debug` for `app_name`. Fails when a global subscriber is already installed.
pub fn init_tracing(app_name: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{DEFAULT_FILTER},{app_name}=debug")));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
}

/// Installs a subscriber writing to the test output, once per process.
///
/// Output is only enabled when `ENABLE_TRACING` is set, which keeps test runs quiet by default.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var(ENABLE_TRACING_ENV_NAME).is_err() {
            return;
        }

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}
