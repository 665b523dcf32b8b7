//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! - LOG_LEVEL controls the filter (plain level or full directives).
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//!
//! Targets in use: `lingo_drill` (startup, transport), `session` (state
//! machine transitions), `oracle` (outbound model calls). Oracle payloads are
//! logged by length only; unusable responses are truncated before logging.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info,session=debug,oracle=info,lingo_drill=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // A second init (tests, embedding) keeps the first subscriber.
    let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());
    let installed = match format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Pretty => builder.try_init().is_ok(),
    };
    if installed {
        tracing::debug!(target: "lingo_drill", ?format, "Tracing initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_defaults_to_pretty() {
        assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(Some("text")), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(Some(" JSON ")), LogFormat::Json);
    }

    #[test]
    fn default_directives_parse() {
        let _ = EnvFilter::try_new(DEFAULT_DIRECTIVES).unwrap();
    }
}
