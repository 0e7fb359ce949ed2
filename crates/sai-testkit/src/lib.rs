//! SAI Testing Infrastructure
//!
//! In-memory remote store, seeded storage layouts and tracing setup shared by
//! the integration tests of every crate.
//!
//! ```toml
//! [dev-dependencies]
//! sai-testkit = { path = "../sai-testkit" }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![forbid(unsafe_code)]

pub mod fixtures;
pub mod store;

pub use fixtures::{rid, PodFixture};
pub use store::{MemoryStore, RecordedRequest};

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a `RUST_LOG`-filtered fmt subscriber once per test binary
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
