#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Account,
    Container,
    Object,
}

impl Subsystem {
    pub const ALL: [Subsystem; 3] = [Subsystem::Container, Subsystem::Account, Subsystem::Object];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Container => "container",
            Self::Object => "object",
        }
    }

    /// The pluralized key used by the quarantined recon resource.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Account => "accounts",
            Self::Container => "containers",
            Self::Object => "objects",
        }
    }
}

/// One observation produced by a sub-scrape, consumed by the registry.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub name: String,
    pub value: f64,
    pub subsystem: Option<Subsystem>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    pub fn as_prometheus_type(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub metric_type: MetricType,
    pub variable_labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MetricSample {
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct CollectedMetric {
    pub descriptor: MetricDescriptor,
    pub samples: Vec<MetricSample>,
}
