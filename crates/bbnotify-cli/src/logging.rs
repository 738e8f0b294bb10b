// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for the bbnotify CLI.
//!
//! Uses `tracing` with `tracing-subscriber`, writing to stderr so that JSON
//! and YAML output on stdout stays parseable. `RUST_LOG` overrides the
//! default filter.
//!
//! # Examples
//!
//! ```bash
//! # Token exchanges, sent mail and transitions
//! bbnotify -v notify
//!
//! # Request and page detail for troubleshooting
//! RUST_LOG=bbnotify_core=debug bbnotify pulls
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const QUIET_FILTER: &str = "bbnotify=warn,bbnotify_core=warn,reqwest=error";
const VERBOSE_FILTER: &str = "bbnotify=info,bbnotify_core=info,reqwest=error";

/// Initialize the logging subsystem.
///
/// # Arguments
///
/// * `verbose` - Raise the default filter to info level (-v flag)
pub fn init_logging(verbose: bool) {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let default_filter = if verbose { VERBOSE_FILTER } else { QUIET_FILTER };
    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
