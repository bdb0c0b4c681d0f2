//! Log subscriber set-up for applications embedding the catalog.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "sacrud_catalog=info";

/// Install a global formatting subscriber filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already set.
pub fn init() -> Result<()> {
    init_with_default(DEFAULT_FILTER)
}

/// Like [`init`], with `default` as the fallback filter directive.
pub fn init_with_default(default: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer())
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
