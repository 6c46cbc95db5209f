use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use swift_exporter_common::error::Result;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::{
    recon::ReconClient,
    registry::MetricRegistry,
    types::{CollectedMetric, MetricDescriptor, ScrapeResult, Subsystem},
};

const NAMESPACE: &str = "swift";

#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Base address of the Swift recon endpoint. Never empty.
    pub swift_addr: String,
    /// Per-fetch deadline. `None` reproduces the unbounded behavior where
    /// a hung upstream hangs the whole collection cycle.
    pub scrape_timeout: Option<Duration>,
}

/// Drives one full collection cycle against the recon endpoint and folds
/// the results into the metric registry.
pub struct SwiftExporter {
    recon: ReconClient,
    registry: MetricRegistry,
    cycle_lock: Mutex<()>,
}

impl SwiftExporter {
    pub async fn connect(config: ExporterConfig) -> Result<Self> {
        debug!(addr = %config.swift_addr, "creating exporter");
        let recon = ReconClient::new(&config.swift_addr, config.scrape_timeout)?;
        recon.ping().await?;

        Ok(Self {
            recon,
            registry: MetricRegistry::new(NAMESPACE),
            cycle_lock: Mutex::new(()),
        })
    }

    /// Label schemas of every currently-registered family, for the
    /// describe half of the exposition contract.
    pub fn descriptors(&self) -> Vec<MetricDescriptor> {
        self.registry.descriptors()
    }

    /// Run one full collection cycle and return the resulting snapshot.
    /// Concurrent callers serialize; two overlapping cycles never
    /// interleave their sub-scrapes.
    pub async fn collect(&self) -> Vec<CollectedMetric> {
        let _cycle = self.cycle_lock.lock().await;
        let started_at = Instant::now();
        self.registry.inc_scrapes();
        self.registry.reset();

        let mut samples = Vec::new();
        let mut errored = false;

        if let Err(err) = self.scrape_async(&mut samples).await {
            error!(error = %err, "async scrape failed");
            errored = true;
        }
        if let Err(err) = self.scrape_replication(&mut samples).await {
            error!(error = %err, "replication scrape failed");
            errored = true;
        }
        if let Err(err) = self.scrape_updater(&mut samples).await {
            error!(error = %err, "updater scrape failed");
            errored = true;
        }
        if let Err(err) = self.scrape_expirer(&mut samples).await {
            error!(error = %err, "expirer scrape failed");
            errored = true;
        }
        if let Err(err) = self.scrape_quarantined(&mut samples).await {
            error!(error = %err, "quarantined scrape failed");
            errored = true;
        }

        debug!(samples = samples.len(), "collection cycle scraped");
        for sample in samples {
            self.registry.fold(sample);
        }

        self.registry
            .set_last_scrape_duration(started_at.elapsed().as_secs_f64());
        self.registry.set_last_scrape_error(errored);
        self.registry.collect_all()
    }

    async fn scrape_async(&self, samples: &mut Vec<ScrapeResult>) -> Result<()> {
        let body = self.recon.get("async").await?;
        if let Some(pending) = number(&body, "async_pending") {
            samples.push(ScrapeResult {
                name: "async".to_string(),
                value: pending,
                subsystem: None,
                status: Some("pending".to_string()),
            });
        }
        Ok(())
    }

    async fn scrape_replication(&self, samples: &mut Vec<ScrapeResult>) -> Result<()> {
        for subsystem in Subsystem::ALL {
            let body = self
                .recon
                .get(&format!("replication/{}", subsystem.as_str()))
                .await?;

            if let Some(time) = number(&body, "replication_time") {
                samples.push(ScrapeResult {
                    name: "replication_time".to_string(),
                    value: time,
                    subsystem: Some(subsystem),
                    status: None,
                });
            }
            if let Some(last) = number(&body, "replication_last") {
                samples.push(ScrapeResult {
                    name: "replication_last".to_string(),
                    value: last,
                    subsystem: Some(subsystem),
                    status: None,
                });
            }
            if let Some(stats) = body.get("replication_stats").and_then(Value::as_object) {
                for (status, value) in stats {
                    // failure_nodes is a nested structure, not a scalar
                    if status == "failure_nodes" {
                        continue;
                    }
                    if let Some(value) = value.as_f64() {
                        samples.push(ScrapeResult {
                            name: "replication_stats".to_string(),
                            value,
                            subsystem: Some(subsystem),
                            status: Some(status.clone()),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    async fn scrape_updater(&self, samples: &mut Vec<ScrapeResult>) -> Result<()> {
        for subsystem in [Subsystem::Container, Subsystem::Object] {
            let body = self
                .recon
                .get(&format!("updater/{}", subsystem.as_str()))
                .await?;

            if let Some(sweep) = number(&body, &format!("{}_updater_sweep", subsystem.as_str())) {
                samples.push(ScrapeResult {
                    name: "updater_sweep".to_string(),
                    value: sweep,
                    subsystem: Some(subsystem),
                    status: None,
                });
            }
        }
        Ok(())
    }

    async fn scrape_expirer(&self, samples: &mut Vec<ScrapeResult>) -> Result<()> {
        for subsystem in [Subsystem::Object] {
            let body = self
                .recon
                .get(&format!("expirer/{}", subsystem.as_str()))
                .await?;

            if let Some(pass) = number(&body, &format!("{}_expiration_pass", subsystem.as_str())) {
                samples.push(ScrapeResult {
                    name: "expirer_expiration_pass".to_string(),
                    value: pass,
                    subsystem: Some(subsystem),
                    status: None,
                });
            }
            if let Some(expired) = number(&body, "expired_last_pass") {
                samples.push(ScrapeResult {
                    name: "expirer_expired_last_pass".to_string(),
                    value: expired,
                    subsystem: Some(subsystem),
                    status: None,
                });
            }
        }
        Ok(())
    }

    async fn scrape_quarantined(&self, samples: &mut Vec<ScrapeResult>) -> Result<()> {
        let body = self.recon.get("quarantined").await?;
        for subsystem in Subsystem::ALL {
            if let Some(count) = number(&body, subsystem.plural()) {
                samples.push(ScrapeResult {
                    name: "quarantined".to_string(),
                    value: count,
                    subsystem: Some(subsystem),
                    status: None,
                });
            }
        }
        Ok(())
    }
}

fn number(body: &Map<String, Value>, key: &str) -> Option<f64> {
    body.get(key).and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::types::CollectedMetric;

    use super::{ExporterConfig, SwiftExporter};

    async fn exporter_for(server: &MockServer) -> SwiftExporter {
        SwiftExporter::connect(ExporterConfig {
            swift_addr: server.uri(),
            scrape_timeout: None,
        })
        .await
        .unwrap()
    }

    async fn mount_json(server: &MockServer, resource: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/recon/{resource}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    /// Every recon resource answers with an empty JSON object unless a
    /// more specific mock was mounted first.
    async fn mount_empty_fallback(server: &MockServer) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(server)
            .await;
    }

    fn find<'a>(collected: &'a [CollectedMetric], name: &str) -> &'a CollectedMetric {
        collected
            .iter()
            .find(|metric| metric.descriptor.name == name)
            .unwrap_or_else(|| panic!("metric {name} not collected"))
    }

    fn sample_value(metric: &CollectedMetric, labels: &[(&str, &str)]) -> Option<f64> {
        let expected = labels
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect::<Vec<_>>();
        metric
            .samples
            .iter()
            .find(|sample| sample.labels == expected)
            .map(|sample| sample.value)
    }

    #[tokio::test]
    async fn descriptors_expose_label_schemas_before_first_cycle() {
        let exporter = SwiftExporter::connect(ExporterConfig {
            swift_addr: "http://127.0.0.1:6000".to_string(),
            scrape_timeout: None,
        })
        .await
        .unwrap();

        let descriptors = exporter.descriptors();
        let stats = descriptors
            .iter()
            .find(|descriptor| descriptor.name == "swift_replication_stats")
            .unwrap();
        assert_eq!(
            stats.variable_labels,
            vec!["type".to_string(), "status".to_string()]
        );
        assert!(
            descriptors
                .iter()
                .any(|descriptor| descriptor.name == "swift_exporter_scrapes_total")
        );
    }

    #[tokio::test]
    async fn async_pending_becomes_status_labeled_sample() {
        let server = MockServer::start().await;
        mount_json(&server, "async", json!({ "async_pending": 3.0 })).await;
        mount_empty_fallback(&server).await;

        let exporter = exporter_for(&server).await;
        let collected = exporter.collect().await;

        let metric = find(&collected, "swift_async");
        assert_eq!(sample_value(metric, &[("status", "pending")]), Some(3.0));
    }

    #[tokio::test]
    async fn replication_stats_skip_failure_nodes() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "replication/object",
            json!({
                "replication_time": 1.5,
                "replication_stats": {
                    "success": 10,
                    "failure": 2,
                    "failure_nodes": { "n1": 1 },
                },
            }),
        )
        .await;
        mount_empty_fallback(&server).await;

        let exporter = exporter_for(&server).await;
        let collected = exporter.collect().await;

        let time = find(&collected, "swift_replication_time");
        assert_eq!(sample_value(time, &[("type", "object")]), Some(1.5));

        let stats = find(&collected, "swift_replication_stats");
        assert_eq!(
            sample_value(stats, &[("type", "object"), ("status", "success")]),
            Some(10.0)
        );
        assert_eq!(
            sample_value(stats, &[("type", "object"), ("status", "failure")]),
            Some(2.0)
        );
        assert!(
            stats
                .samples
                .iter()
                .all(|sample| sample.labels.iter().all(|(_, v)| v != "failure_nodes"))
        );
    }

    #[tokio::test]
    async fn quarantined_uses_pluralized_keys() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "quarantined",
            json!({ "objects": 5, "accounts": 0, "containers": 2 }),
        )
        .await;
        mount_empty_fallback(&server).await;

        let exporter = exporter_for(&server).await;
        let collected = exporter.collect().await;

        let metric = find(&collected, "swift_quarantined");
        assert_eq!(sample_value(metric, &[("type", "object")]), Some(5.0));
        assert_eq!(sample_value(metric, &[("type", "account")]), Some(0.0));
        assert_eq!(sample_value(metric, &[("type", "container")]), Some(2.0));
    }

    #[tokio::test]
    async fn missing_field_yields_no_sample_and_no_error() {
        let server = MockServer::start().await;
        mount_empty_fallback(&server).await;

        let exporter = exporter_for(&server).await;
        let collected = exporter.collect().await;

        let metric = find(&collected, "swift_updater_sweep");
        assert!(metric.samples.is_empty());

        let error = find(&collected, "swift_exporter_last_scrape_error");
        assert_eq!(error.samples[0].value, 0.0);
    }

    #[tokio::test]
    async fn expirer_fields_are_extracted() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "expirer/object",
            json!({ "object_expiration_pass": 12.0, "expired_last_pass": 4.0 }),
        )
        .await;
        mount_empty_fallback(&server).await;

        let exporter = exporter_for(&server).await;
        let collected = exporter.collect().await;

        let pass = find(&collected, "swift_expirer_expiration_pass");
        assert_eq!(sample_value(pass, &[("type", "object")]), Some(12.0));
        let expired = find(&collected, "swift_expirer_expired_last_pass");
        assert_eq!(sample_value(expired, &[("type", "object")]), Some(4.0));
    }

    #[tokio::test]
    async fn fetch_failure_skips_sub_scrape_but_cycle_completes() {
        let server = MockServer::start().await;
        // Non-JSON error body: the quarantined sub-scrape fails to decode.
        Mock::given(method("GET"))
            .and(path("/recon/quarantined"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        mount_json(&server, "async", json!({ "async_pending": 1.0 })).await;
        mount_empty_fallback(&server).await;

        let exporter = exporter_for(&server).await;
        let collected = exporter.collect().await;

        let quarantined = find(&collected, "swift_quarantined");
        assert!(quarantined.samples.is_empty());

        // The cycle still produced the healthy sub-scrapes and the scalars.
        let async_metric = find(&collected, "swift_async");
        assert_eq!(sample_value(async_metric, &[("status", "pending")]), Some(1.0));
        let error = find(&collected, "swift_exporter_last_scrape_error");
        assert_eq!(error.samples[0].value, 1.0);
        let scrapes = find(&collected, "swift_exporter_scrapes_total");
        assert_eq!(scrapes.samples[0].value, 1.0);
    }

    #[tokio::test]
    async fn unreachable_upstream_still_emits_health_scalars() {
        // Bind-then-drop to get an address nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let exporter = SwiftExporter::connect(ExporterConfig {
            swift_addr: addr,
            scrape_timeout: Some(std::time::Duration::from_secs(1)),
        })
        .await
        .unwrap();

        let collected = exporter.collect().await;
        let scrapes = find(&collected, "swift_exporter_scrapes_total");
        assert_eq!(scrapes.samples[0].value, 1.0);
        let error = find(&collected, "swift_exporter_last_scrape_error");
        assert_eq!(error.samples[0].value, 1.0);
        let duration = find(&collected, "swift_exporter_last_scrape_duration_seconds");
        assert!(duration.samples[0].value >= 0.0);
    }

    #[tokio::test]
    async fn second_cycle_drops_stale_series() {
        let server = MockServer::start().await;
        mount_json(&server, "async", json!({ "async_pending": 3.0 }))
            .await;
        mount_empty_fallback(&server).await;

        let exporter = exporter_for(&server).await;
        let first = exporter.collect().await;
        assert_eq!(
            sample_value(find(&first, "swift_async"), &[("status", "pending")]),
            Some(3.0)
        );

        // Upstream stops reporting the field; the series must disappear.
        server.reset().await;
        mount_empty_fallback(&server).await;

        let second = exporter.collect().await;
        assert!(find(&second, "swift_async").samples.is_empty());
        let scrapes = find(&second, "swift_exporter_scrapes_total");
        assert_eq!(scrapes.samples[0].value, 2.0);
    }
}
