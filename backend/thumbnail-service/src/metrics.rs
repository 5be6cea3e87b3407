use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};
use tracing::warn;

/// Counters for the thumbnail pipeline, registered on the default registry
#[derive(Clone)]
pub struct ThumbnailMetrics {
    pub processed: IntCounter,
    pub failed: IntCounterVec,
    pub empty_polls: IntCounter,
}

impl ThumbnailMetrics {
    pub fn new(service: &str) -> Self {
        let registry = prometheus::default_registry();

        let processed = IntCounter::with_opts(
            Opts::new(
                "thumbnail_jobs_processed_total",
                "Total number of thumbnail jobs that produced a stored thumbnail",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for thumbnail_jobs_processed_total");

        let failed = IntCounterVec::new(
            Opts::new(
                "thumbnail_jobs_failed_total",
                "Total number of thumbnail job invocations that failed, by stage",
            )
            .const_label("service", service.to_string()),
            &["stage"],
        )
        .expect("valid metric opts for thumbnail_jobs_failed_total");

        let empty_polls = IntCounter::with_opts(
            Opts::new(
                "thumbnail_queue_empty_polls_total",
                "Total number of queue polls that returned no job",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for thumbnail_queue_empty_polls_total");

        for metric in [
            Box::new(processed.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(failed.clone()),
            Box::new(empty_polls.clone()),
        ] {
            if let Err(e) = registry.register(metric) {
                warn!("Failed to register thumbnail metric: {}", e);
            }
        }

        Self {
            processed,
            failed,
            empty_polls,
        }
    }
}

/// Render the default registry in the Prometheus text format
pub fn render() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
