use tracing_subscriber::prelude::*;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
};

/// Installs the global subscriber with `info` as the fallback filter.
pub fn init() {
    init_with("info");
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_directive`.
///
/// When debug or trace output is enabled, every stage span (`edge_map`, `exclusion`,
/// `region_grow`, ...) is reported on close along with its duration.
pub fn init_with(default_directive: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let stage_timings = reports_stage_timings(&env_filter);

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_span_events(if stage_timings { FmtSpan::CLOSE } else { FmtSpan::NONE });

    // Tests and embedding hosts may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

/// Span-close timings are worth the noise only at debug verbosity or finer.
fn reports_stage_timings(filter: &EnvFilter) -> bool {
    let directives = filter.to_string().to_ascii_lowercase();
    directives.contains("debug") || directives.contains("trace")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_timings_follow_verbosity() {
        assert!(!reports_stage_timings(&EnvFilter::new("info")));
        assert!(!reports_stage_timings(&EnvFilter::new("wall_vision=warn")));
        assert!(reports_stage_timings(&EnvFilter::new("wall_vision=debug")));
        assert!(reports_stage_timings(&EnvFilter::new("trace")));
        assert!(reports_stage_timings(&EnvFilter::new("info,wall_vision=trace")));
    }
}
