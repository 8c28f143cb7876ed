use std::borrow::Cow;

use sentry::integrations::tracing::EventFilter;
use sentry::{ClientInitGuard, ClientOptions};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::prelude::*;

const FORMAT_FILTER_VARIABLE: &str = "RATINGS_SF_LOG";
const SENTRY_FILTER_VARIABLE: &str = "RATINGS_SF_SENTRY_LOG";

/// Initialises tracing.
///
/// The returned guard must be held until the process exits, otherwise the
/// pending Sentry events get dropped.
pub fn init(sentry_dsn: Option<String>, traces_sample_rate: f32) -> Result<ClientInitGuard> {
    let guard = sentry::init((
        sentry_dsn,
        ClientOptions {
            release: Some(Cow::Borrowed(env!("CARGO_PKG_VERSION"))),
            traces_sample_rate,
            ..Default::default()
        },
    ));

    let sentry_filter = env_filter(SENTRY_FILTER_VARIABLE, "ratings_sf=trace")?;
    let sentry_layer = sentry::integrations::tracing::layer()
        .event_filter(|metadata| match metadata.level() {
            &Level::ERROR | &Level::WARN => EventFilter::Event,
            &Level::INFO | &Level::DEBUG | &Level::TRACE => EventFilter::Breadcrumb,
        })
        .span_filter(|metadata| {
            matches!(metadata.level(), &Level::ERROR | &Level::WARN | &Level::INFO)
        })
        .with_filter(sentry_filter);

    let format_filter = env_filter(FORMAT_FILTER_VARIABLE, "ratings_sf=info")?;
    let format_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_filter(format_filter);

    tracing_subscriber::Registry::default()
        .with(sentry_layer)
        .with(format_layer)
        .init();

    Ok(guard)
}

/// Reads the filter directives from the variable, falling back to `default`
/// when it is unset. Malformed directives in the variable are an error.
fn env_filter(variable: &str, default: &str) -> Result<EnvFilter> {
    match std::env::var(variable) {
        Ok(directives) => EnvFilter::try_new(&directives)
            .with_context(|| format!("invalid `{}`: `{}`", variable, directives)),
        Err(_) => EnvFilter::try_new(default)
            .with_context(|| format!("invalid default filter `{}`", default)),
    }
}

pub fn format_duration(duration: StdDuration) -> String {
    humantime::format_duration(duration).to_string()
}

pub fn format_elapsed(instant: Instant) -> String {
    format_duration(instant.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_default_ok() -> crate::Result {
        let filter = env_filter("RATINGS_SF_TEST_UNSET_FILTER", "ratings_sf=debug")?;
        assert_eq!(filter.to_string(), "ratings_sf=debug");
        Ok(())
    }

    #[test]
    fn env_filter_invalid_default_fails() {
        assert!(env_filter("RATINGS_SF_TEST_UNSET_FILTER", "ratings_sf=loud").is_err());
    }

    #[test]
    fn format_duration_ok() {
        assert_eq!(format_duration(StdDuration::from_millis(1500)), "1s 500ms");
        assert_eq!(format_duration(StdDuration::from_secs(90)), "1m 30s");
    }
}
