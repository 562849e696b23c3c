//! Test support for native-bridge
//!
//! This library provides [`FakeBackend`], a simulated native library, and the
//! helpers the main-thread test binary and benches use to install it as the
//! bridge runtime.

use std::sync::Arc;

use native_bridge::runtime::{self, BridgeBuilder};

pub mod fake;

pub use fake::{FIRST_HANDLE, FakeBackend};

/// Install `tracing` output for tests. `RUST_LOG` overrides the default
/// filter. Safe to call more than once.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("native_bridge=info,native=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Uninstalls the runtime when dropped, so a failing test does not leave it
/// behind for the next one.
struct Installed;

impl Drop for Installed {
    fn drop(&mut self) {
        let _ = runtime::shutdown();
    }
}

/// Run `test` against a freshly installed [`FakeBackend`].
///
/// # Example
///
/// ```ignore
/// use native_bridge::Window;
/// use native_bridge_testing::with_fake_backend;
///
/// with_fake_backend(|fake| {
///     let window = Window::open("demo", 0, 0, 640, 480, 0).unwrap();
///     window.dispose();
///     assert_eq!(fake.live_objects(), 0);
/// });
/// ```
pub fn with_fake_backend<R>(test: impl FnOnce(&Arc<FakeBackend>) -> R) -> R {
    with_fake_backend_configured(BridgeBuilder::new(), test)
}

/// Like [`with_fake_backend`], with a custom bridge configuration.
pub fn with_fake_backend_configured<R>(
    builder: BridgeBuilder,
    test: impl FnOnce(&Arc<FakeBackend>) -> R,
) -> R {
    let fake = Arc::new(FakeBackend::new());
    if let Err(err) = builder.install(fake.clone()) {
        panic!("failed to install the fake backend: {err}");
    }
    let _installed = Installed;
    test(&fake)
}

/// Run a named test, printing its outcome the way the test binary reports.
pub fn run_test(name: &str, test: fn()) {
    print!("test {name} ... ");
    test();
    println!("ok");
}
