use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

/// Install the fmt subscriber once. A cdylib host has no Rust main to do
/// this, so the first export that runs pays the setup; `try_init` keeps an
/// embedding host's own subscriber authoritative when one is installed.
pub(crate) fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                EnvFilter::new("warn,flacbridge=debug,flacbridge_decode=debug")
            } else {
                EnvFilter::new("info")
            }
        });
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(LocalTime::rfc_3339())
            .with_target(true)
            .with_thread_names(true)
            .with_thread_ids(true)
            .try_init();
    });
}
