use swift_exporter_core::CollectedMetric;

/// Render collected metrics in the Prometheus text exposition format
/// (version 0.0.4). Samples are always fresh out of a collection cycle,
/// so no timestamps are attached.
pub fn render_exposition(metrics: &[CollectedMetric]) -> String {
    let mut output = String::new();

    for metric in metrics {
        output.push_str("# HELP ");
        output.push_str(&metric.descriptor.name);
        output.push(' ');
        output.push_str(&escape_help(&metric.descriptor.help));
        output.push('\n');

        output.push_str("# TYPE ");
        output.push_str(&metric.descriptor.name);
        output.push(' ');
        output.push_str(metric.descriptor.metric_type.as_prometheus_type());
        output.push('\n');

        for sample in &metric.samples {
            output.push_str(&render_sample_line(
                &metric.descriptor.name,
                &sample.labels,
                sample.value,
            ));
        }
    }

    output
}

fn render_sample_line(name: &str, labels: &[(String, String)], value: f64) -> String {
    let mut rendered = String::new();
    rendered.push_str(name);

    if !labels.is_empty() {
        rendered.push('{');
        for (index, (key, value)) in labels.iter().enumerate() {
            if index > 0 {
                rendered.push(',');
            }
            rendered.push_str(key);
            rendered.push_str("=\"");
            rendered.push_str(&escape_label_value(value));
            rendered.push('"');
        }
        rendered.push('}');
    }

    rendered.push(' ');
    rendered.push_str(&format_metric_value(value));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use swift_exporter_core::{CollectedMetric, MetricDescriptor, MetricSample, MetricType};

    use super::render_exposition;

    fn gauge(name: &str, labels: &[(&str, &str)], value: f64) -> CollectedMetric {
        CollectedMetric {
            descriptor: MetricDescriptor {
                name: name.to_string(),
                help: format!("{name} metric"),
                metric_type: MetricType::Gauge,
                variable_labels: labels.iter().map(|(k, _)| (*k).to_string()).collect(),
            },
            samples: vec![MetricSample {
                labels: labels
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
                value,
            }],
        }
    }

    #[test]
    fn renders_help_type_and_labeled_sample() {
        let rendered = render_exposition(&[gauge(
            "swift_quarantined",
            &[("type", "object")],
            5.0,
        )]);
        assert_eq!(
            rendered,
            "# HELP swift_quarantined swift_quarantined metric\n\
             # TYPE swift_quarantined gauge\n\
             swift_quarantined{type=\"object\"} 5\n"
        );
    }

    #[test]
    fn renders_unlabeled_scalar_with_fraction() {
        let rendered = render_exposition(&[gauge("swift_exporter_last_scrape_duration_seconds", &[], 0.25)]);
        assert!(rendered.ends_with("swift_exporter_last_scrape_duration_seconds 0.25\n"));
    }

    #[test]
    fn escapes_label_values() {
        let rendered = render_exposition(&[gauge("swift_async", &[("status", "pe\"nd\\ing")], 1.0)]);
        assert!(rendered.contains("status=\"pe\\\"nd\\\\ing\""));
    }
}
