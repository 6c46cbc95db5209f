pub mod exporter;
pub mod recon;
pub mod registry;
pub mod types;

pub use exporter::{ExporterConfig, SwiftExporter};
pub use recon::ReconClient;
pub use registry::MetricRegistry;
pub use types::{
    CollectedMetric, MetricDescriptor, MetricSample, MetricType, ScrapeResult, Subsystem,
};
