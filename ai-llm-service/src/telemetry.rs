//! Tracing setup shared by the binary and the library crates.
//!
//! Produces compact single-line logs with RFC3339 UTC timestamps. The filter
//! comes from `RUST_LOG`, falling back to the given default.

use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Crate target prefix of this library.
pub const TARGET_PREFIX: &str = "ai_llm_service";

/// RFC3339 UTC timer, e.g. `2025-09-12T10:20:30Z`.
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        let s = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

/// Level directive for a single crate target, e.g. `rag_base=debug`.
///
/// Returns `None` when `target` is not a valid directive.
pub fn level_directive(target: &str, level: Level) -> Option<Directive> {
    let s = format!("{target}={}", level.as_str().to_lowercase());
    Directive::from_str(&s).ok()
}

/// `RUST_LOG` filter, or `default` when unset/invalid, with optional per-crate overrides.
pub fn env_filter(default: &str, overrides: &[(&str, Level)]) -> EnvFilter {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    for (target, level) in overrides {
        if let Some(d) = level_directive(target, *level) {
            filter = filter.add_directive(d);
        }
    }
    filter
}

/// Installs the global subscriber. Calling it twice is a no-op.
///
/// - RFC3339 UTC timestamps
/// - target and `file:line`
/// - ANSI colors only when stdout is a terminal
pub fn init(default: &str, overrides: &[(&str, Level)]) {
    let layer = fmt::layer()
        .compact()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(io::stdout().is_terminal());

    let _ = tracing_subscriber::registry()
        .with(env_filter(default, overrides))
        .with(layer)
        .try_init();
}
