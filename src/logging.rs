// File: src/logging.rs
// Structured logging setup for the `am_test` binary.
//
// - `RUST_LOG` environment filter, default `am_test=info,eval_core=info`
// - JSON output when `RUST_LOG_FORMAT=json`
// - Human-readable output on stderr otherwise, so stdout stays free for the
//   progress lines

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "am_test=info,eval_core=info";

/// Initialize the global tracing subscriber. Subsequent calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let is_json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if is_json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}
