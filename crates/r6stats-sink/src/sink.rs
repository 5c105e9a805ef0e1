use futures::future::BoxFuture;
use r6stats_core::MetricPoint;

/// Destination for collected points.
///
/// `write` only buffers and must never wait on network I/O. `flush` delivers
/// everything buffered so far; delivery failures are reported on the
/// background error channel rather than returned, and never roll back points
/// that were already written.
pub trait MetricSink: Send + Sync {
    fn write(&self, point: MetricPoint);

    fn flush(&self) -> BoxFuture<'_, ()>;
}
