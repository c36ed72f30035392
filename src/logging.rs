//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_DATASET_PREPARER` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no logging will be initialized at load time.
//! - **Enabled**: Any other value enables logging with a maximum log level of `DEBUG`.
//!
//! Binaries can also call [`init`] to pick a level explicitly. Only the first
//! initialization takes effect; later calls are ignored.
//!
//! ### Usage Example
//!
//! ```sh
//! export DEBUG_DATASET_PREPARER=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Environment variable that turns on debug logging at load time.
pub const DEBUG_ENV_VAR: &str = "DEBUG_DATASET_PREPARER";

/// Returns true when `DEBUG_DATASET_PREPARER` requests debug logging.
pub fn debug_requested() -> bool {
    std::env::var(DEBUG_ENV_VAR).map_or(false, |v| !(v == "0" || v == "false" || v.is_empty()))
}

/// Installs a stderr `fmt` subscriber with the given maximum level.
pub fn init(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

#[ctor]
fn set_debug_level() {
    if debug_requested() {
        init(Level::DEBUG);
    }
}
