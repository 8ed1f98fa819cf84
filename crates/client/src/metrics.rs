use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use schema::RequestMode;

/// Instruments recorded through the global meter. No-ops until a meter
/// provider is installed.
pub(crate) struct ClientMetrics {
    requests: Counter<u64>,
    request_duration: Histogram<f64>,
    timeouts: Counter<u64>,
    reconnect_attempts: Counter<u64>,
    malformed_messages: Counter<u64>,
    stream_ticks_skipped: Counter<u64>,
}

impl ClientMetrics {
    pub fn new() -> Self {
        let meter = global::meter("client");
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0, 15.0,
        ];

        Self {
            requests: meter
                .u64_counter("client_requests_total")
                .with_description("Detection requests sent to the service")
                .build(),
            request_duration: meter
                .f64_histogram("client_request_duration_seconds")
                .with_description("Time from sending a request to receiving its response")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            timeouts: meter
                .u64_counter("client_request_timeouts_total")
                .with_description("Requests that got no response in time")
                .build(),
            reconnect_attempts: meter
                .u64_counter("client_reconnect_attempts_total")
                .with_description("Automatic reconnect attempts scheduled")
                .build(),
            malformed_messages: meter
                .u64_counter("client_malformed_messages_total")
                .with_description("Inbound frames that were not valid responses")
                .build(),
            stream_ticks_skipped: meter
                .u64_counter("client_stream_ticks_skipped_total")
                .with_description("Stream ticks skipped while a frame was in flight")
                .build(),
        }
    }

    pub fn request_sent(&self, mode: RequestMode) {
        self.requests.add(1, &[KeyValue::new("mode", mode.as_str())]);
    }

    pub fn request_finished(&self, mode: RequestMode, elapsed_secs: f64) {
        self.request_duration
            .record(elapsed_secs, &[KeyValue::new("mode", mode.as_str())]);
    }

    pub fn request_timed_out(&self) {
        self.timeouts.add(1, &[]);
    }

    pub fn reconnect_scheduled(&self) {
        self.reconnect_attempts.add(1, &[]);
    }

    pub fn malformed_message(&self) {
        self.malformed_messages.add(1, &[]);
    }

    pub fn tick_skipped(&self) {
        self.stream_ticks_skipped.add(1, &[]);
    }
}
