pub mod builders;
pub mod fake_transport;
pub mod launchers;

use std::sync::{Arc, Once};

use adminagent::config::ConfigFile;
use adminagent::engine::{JobEngine, Launcher, SystemLauncher};
use adminagent::facade::Dispatcher;
use adminagent::notify::spawn_dispatcher;
use adminagent::types::ReportMode;
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::ConfigBuilder;
pub use fake_transport::{FakeTransport, Sent};
pub use launchers::FailingLauncher;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// A façade wired to a [`FakeTransport`] and the real process launcher.
///
/// Must be called inside a Tokio runtime.
pub fn dispatcher(cfg: ConfigFile) -> (Dispatcher, Sent) {
    dispatcher_with(cfg, SystemLauncher)
}

/// Like [`dispatcher`], with a custom launcher.
pub fn dispatcher_with<L: Launcher>(cfg: ConfigFile, launcher: L) -> (Dispatcher, Sent) {
    let (transport, sent) = FakeTransport::new();
    let (notifier, _task) = spawn_dispatcher(transport, ReportMode::Markdown);
    let engine = JobEngine::new(notifier, Arc::new(launcher), cfg.limits.max_concurrent_jobs);
    (Dispatcher::new(Arc::new(cfg), engine), sent)
}
