pub mod builders;
pub mod scripted_backend;

use std::sync::Once;

use pipetask::item::Item;
use pipetask::logging::LOG_ENV_VAR;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Logs go through `with_test_writer()`, so the harness only shows them for
/// failing tests (unless run with `-- --nocapture`).
///
/// The filter comes from `PIPETASK_LOG`, then `RUST_LOG`, e.g.
/// `PIPETASK_LOG=pipetask::exec=trace cargo test`. Without either, the
/// crate logs at debug and everything else at warn.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("pipetask=debug,warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Run a future with a 10-second timeout.
///
/// Real-process tests retry with a zero delay but still poll exit status
/// every 250 ms, so this leaves room for a few dozen attempts.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// The item's output log with the terminal's "\r\n" folded back to "\n".
pub fn terminal_log(item: &Item) -> String {
    item.output_lossy().replace("\r\n", "\n")
}
