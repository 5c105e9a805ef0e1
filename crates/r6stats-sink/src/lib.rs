//! Metric sink: the [`MetricSink`] seam and an InfluxDB v2 implementation.

pub mod error;
pub mod influx;
pub mod line;
pub mod sink;

pub use error::SinkError;
pub use influx::{HealthInfo, InfluxSink, InfluxSinkConfig};
pub use line::encode_point;
pub use sink::MetricSink;
