//! Shared helpers for sitepipe's integration tests.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

static TRACING: OnceLock<()> = OnceLock::new();

/// Route `tracing` output into the test harness.
///
/// Captured logs only show for failing tests (or with `--nocapture`).
/// `RUST_LOG` picks the filter; the default is `sitepipe=debug`.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,sitepipe=debug"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Fail the test instead of hanging when `f` takes longer than 5 seconds.
pub async fn with_timeout<F: Future>(f: F) -> F::Output {
    match tokio::time::timeout(Duration::from_secs(5), f).await {
        Ok(output) => output,
        Err(_) => panic!("test timed out after 5 seconds"),
    }
}
