//! Tracing setup for the command line tool
//!
//! Library code only emits events; installing a subscriber is up to the
//! binary. The filter comes from `RUST_LOG` when set, otherwise from the
//! verbosity flag.

use tracing_subscriber::{
    Layer,
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default directive when `RUST_LOG` is unset
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "jstmpl=debug,info" } else { "info" }
}

/// Initialize tracing for the CLI (uses RUST_LOG env var)
///
/// In verbose mode span closings are logged with their timings, which shows
/// how long each compile and render took.
pub fn init_standard_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let span_events = if verbose { FmtSpan::CLOSE } else { FmtSpan::NONE };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_span_events(span_events)
                .with_filter(filter),
        )
        .init();
}
