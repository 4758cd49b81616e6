use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_CACHE_EVICT_TOTAL, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_INVALIDATED_TOTAL,
    METRIC_CACHE_MISS_TOTAL, METRIC_CACHE_STORE_ERROR_TOTAL,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;
use super::notifications::{
    METRIC_NOTIFICATION_DELIVERED_TOTAL, METRIC_NOTIFICATION_DROPPED_TOTAL,
};

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions with whichever metrics recorder is installed.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT_TOTAL,
            Unit::Count,
            "Total number of listing cache hits."
        );
        describe_counter!(
            METRIC_CACHE_MISS_TOTAL,
            Unit::Count,
            "Total number of listing cache misses, including lookups that failed."
        );
        describe_counter!(
            METRIC_CACHE_STORE_ERROR_TOTAL,
            Unit::Count,
            "Total number of cache store failures, labelled by operation."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATED_TOTAL,
            Unit::Count,
            "Total number of cached listing entries removed by invalidation."
        );
        describe_counter!(
            METRIC_CACHE_EVICT_TOTAL,
            Unit::Count,
            "Total number of in-memory cache evictions due to capacity."
        );
        describe_counter!(
            METRIC_NOTIFICATION_DELIVERED_TOTAL,
            Unit::Count,
            "Total number of notifications delivered by the worker."
        );
        describe_counter!(
            METRIC_NOTIFICATION_DROPPED_TOTAL,
            Unit::Count,
            "Total number of notifications dropped before delivery."
        );
    });
}
