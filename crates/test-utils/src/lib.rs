pub mod builders;
pub mod driver;
pub mod fake_runner;

use std::sync::{Arc, Once};

use makedag::config::{BuildFile, build_context, build_options};
use makedag::fs::MockFileSystem;
use makedag::make::BuildContext;
use makedag::types::MTime;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Start of every test build. Files dated before it are "old"; the fake
/// runners stamp their outputs after it.
pub const NOW_SECS: u64 = 1_000_000;

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

/// Populate a context from `file` over a mock file system, with the build
/// clock fixed at [`NOW_SECS`].
pub fn mock_context(file: &BuildFile, fs: &MockFileSystem) -> BuildContext {
    let options = build_options(&file.config);
    build_context(file, Arc::new(fs.clone()), options)
        .expect("build file should populate a context")
        .with_now(MTime::from_secs(NOW_SECS))
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
