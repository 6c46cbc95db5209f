use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicI64, AtomicU64, Ordering},
    },
};

use crate::types::{CollectedMetric, MetricDescriptor, MetricSample, MetricType, ScrapeResult};

type LabelValues = Vec<String>;

/// The fixed catalog of gauge families seeded at every cycle start:
/// (bare name, help, label schema).
const KNOWN_METRICS: [(&str, &str, &[&str]); 8] = [
    ("async", "async metric", &["status"]),
    ("replication_time", "replication_time metric", &["type"]),
    ("replication_last", "replication_last metric", &["type"]),
    (
        "replication_stats",
        "replication_stats metric",
        &["type", "status"],
    ),
    ("updater_sweep", "updater_sweep metric", &["type"]),
    (
        "expirer_expiration_pass",
        "expirer_expiration_pass metric",
        &["type"],
    ),
    (
        "expirer_expired_last_pass",
        "expirer_expired_last_pass metric",
        &["type"],
    ),
    ("quarantined", "quarantined metric", &["type"]),
];

struct MetricEntry {
    descriptor: MetricDescriptor,
    values: RwLock<HashMap<LabelValues, f64>>,
}

impl MetricEntry {
    fn new(namespace: &str, name: &str, help: &str, variable_labels: &[&str]) -> Self {
        Self {
            descriptor: MetricDescriptor {
                name: format!("{namespace}_{name}"),
                help: help.to_string(),
                metric_type: MetricType::Gauge,
                variable_labels: variable_labels
                    .iter()
                    .map(|label| (*label).to_string())
                    .collect(),
            },
            values: RwLock::new(HashMap::new()),
        }
    }

    fn set(&self, label_values: LabelValues, value: f64) {
        if let Ok(mut guard) = self.values.write() {
            guard.insert(label_values, value);
        }
    }

    fn collect(&self) -> Vec<MetricSample> {
        let values = match self.values.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };

        let mut samples = values
            .iter()
            .map(|(label_values, value)| MetricSample {
                labels: self
                    .descriptor
                    .variable_labels
                    .iter()
                    .zip(label_values.iter())
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
                value: *value,
            })
            .collect::<Vec<_>>();

        samples.sort_by(|left, right| left.labels.cmp(&right.labels));
        samples
    }
}

/// Growable mapping from metric name to a multi-label gauge family, plus
/// the three pipeline-health scalars that live outside the map and are
/// never reset.
pub struct MetricRegistry {
    namespace: String,
    entries: RwLock<HashMap<String, Arc<MetricEntry>>>,
    scrapes_total: AtomicU64,
    last_scrape_duration: Mutex<f64>,
    last_scrape_error: AtomicI64,
}

impl MetricRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        let registry = Self {
            namespace: namespace.into(),
            entries: RwLock::new(HashMap::new()),
            scrapes_total: AtomicU64::new(0),
            last_scrape_duration: Mutex::new(0.0),
            last_scrape_error: AtomicI64::new(0),
        };
        registry.reset();
        registry
    }

    /// Re-create the fixed catalog, discarding all prior entries
    /// (dynamic ones included) so stale label combinations from a
    /// previous cycle do not linger. Health scalars survive.
    pub fn reset(&self) {
        let mut fresh = HashMap::with_capacity(KNOWN_METRICS.len());
        for (name, help, labels) in KNOWN_METRICS {
            fresh.insert(
                name.to_string(),
                Arc::new(MetricEntry::new(&self.namespace, name, help, labels)),
            );
        }

        if let Ok(mut guard) = self.entries.write() {
            *guard = fresh;
        }
    }

    /// Fold one scrape result into its gauge family, registering a new
    /// two-label family on the fly for names outside the known catalog.
    /// Overwrites any existing value at the same label tuple.
    pub fn fold(&self, sample: ScrapeResult) {
        let Some(entry) = self.get_or_register(&sample.name) else {
            return;
        };

        let label_values = entry
            .descriptor
            .variable_labels
            .iter()
            .map(|label| match label.as_str() {
                "type" => sample
                    .subsystem
                    .map(|subsystem| subsystem.as_str().to_string())
                    .unwrap_or_default(),
                "status" => sample.status.clone().unwrap_or_default(),
                _ => String::new(),
            })
            .collect::<LabelValues>();

        entry.set(label_values, sample.value);
    }

    fn get_or_register(&self, name: &str) -> Option<Arc<MetricEntry>> {
        if let Ok(guard) = self.entries.read()
            && let Some(existing) = guard.get(name)
        {
            return Some(existing.clone());
        }

        let mut guard = self.entries.write().ok()?;
        let entry = guard.entry(name.to_string()).or_insert_with(|| {
            Arc::new(MetricEntry::new(
                &self.namespace,
                name,
                &format!("{name} metric"),
                &["type", "status"],
            ))
        });
        Some(entry.clone())
    }

    pub fn inc_scrapes(&self) {
        self.scrapes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_last_scrape_duration(&self, seconds: f64) {
        if let Ok(mut guard) = self.last_scrape_duration.lock() {
            *guard = seconds;
        }
    }

    pub fn set_last_scrape_error(&self, errored: bool) {
        self.last_scrape_error
            .store(if errored { 1 } else { 0 }, Ordering::Relaxed);
    }

    pub fn descriptors(&self) -> Vec<MetricDescriptor> {
        self.collect_all()
            .into_iter()
            .map(|metric| metric.descriptor)
            .collect()
    }

    /// Yield every entry plus the three health scalars, sorted by name
    /// for deterministic exposition.
    pub fn collect_all(&self) -> Vec<CollectedMetric> {
        let mut collected = {
            let entries = match self.entries.read() {
                Ok(guard) => guard,
                Err(_) => return Vec::new(),
            };

            entries
                .values()
                .map(|entry| CollectedMetric {
                    descriptor: entry.descriptor.clone(),
                    samples: entry.collect(),
                })
                .collect::<Vec<_>>()
        };

        collected.extend(self.health_scalars());
        collected.sort_by(|left, right| left.descriptor.name.cmp(&right.descriptor.name));
        collected
    }

    fn health_scalars(&self) -> Vec<CollectedMetric> {
        let duration = match self.last_scrape_duration.lock() {
            Ok(guard) => *guard,
            Err(_) => 0.0,
        };

        vec![
            self.scalar(
                "exporter_last_scrape_duration_seconds",
                "The last scrape duration",
                MetricType::Gauge,
                duration,
            ),
            self.scalar(
                "exporter_scrapes_total",
                "Current total swift scrapes",
                MetricType::Counter,
                self.scrapes_total.load(Ordering::Relaxed) as f64,
            ),
            self.scalar(
                "exporter_last_scrape_error",
                "The last scrape error status",
                MetricType::Gauge,
                self.last_scrape_error.load(Ordering::Relaxed) as f64,
            ),
        ]
    }

    fn scalar(&self, name: &str, help: &str, metric_type: MetricType, value: f64) -> CollectedMetric {
        CollectedMetric {
            descriptor: MetricDescriptor {
                name: format!("{}_{name}", self.namespace),
                help: help.to_string(),
                metric_type,
                variable_labels: Vec::new(),
            },
            samples: vec![MetricSample {
                labels: Vec::new(),
                value,
            }],
        }
    }
}
