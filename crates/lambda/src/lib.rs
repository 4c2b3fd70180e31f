//! Lambda handlers for the cloudkit examples.
//!
//! Each handler is written against the traits in `cloudkit_core` so it can be
//! exercised with the in-memory fakes. The binaries under `src/bin` wire the
//! handlers to the AWS adapters and the Lambda runtime.

pub mod apigw;
pub mod cloudtrail;
pub mod config;
pub mod convert;
pub mod restart;
pub mod temperature;

use tracing_subscriber::EnvFilter;

/// Plain-text result most handlers return to the runtime.
pub const SUCCESS: &str = "success";

/// Installs the log subscriber used by every function.
///
/// CloudWatch adds its own timestamp, so time and target are left out. The
/// level comes from `RUST_LOG` and defaults to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();
}
