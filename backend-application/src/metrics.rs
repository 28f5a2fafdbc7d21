use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    ingest_requests: AtomicU64,
    events_received: AtomicU64,
    events_stored: AtomicU64,
    detections: AtomicU64,
    storage_errors: AtomicU64,
}

impl Metrics {
    pub fn record_batch(&self, received: u64, stored: u64) {
        self.ingest_requests.fetch_add(1, Ordering::Relaxed);
        self.events_received.fetch_add(received, Ordering::Relaxed);
        self.events_stored.fetch_add(stored, Ordering::Relaxed);
    }

    pub fn record_detections(&self, count: usize) {
        self.detections.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_storage_error(&self) {
        self.storage_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_prometheus(&self) -> String {
        let requests = self.ingest_requests.load(Ordering::Relaxed);
        let received = self.events_received.load(Ordering::Relaxed);
        let stored = self.events_stored.load(Ordering::Relaxed);
        let detections = self.detections.load(Ordering::Relaxed);
        let storage_errors = self.storage_errors.load(Ordering::Relaxed);

        format!(
            "# TYPE vigil_ingest_requests_total counter\n\
vigil_ingest_requests_total {}\n\
# TYPE vigil_events_received_total counter\n\
vigil_events_received_total {}\n\
# TYPE vigil_events_stored_total counter\n\
vigil_events_stored_total {}\n\
# TYPE vigil_detections_total counter\n\
vigil_detections_total {}\n\
# TYPE vigil_storage_errors_total counter\n\
vigil_storage_errors_total {}\n",
            requests, received, stored, detections, storage_errors
        )
    }
}
