use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use swift_exporter_core::{CollectedMetric, MetricDescriptor, MetricSample, MetricType, SwiftExporter};

use crate::encoding::render_exposition;

pub struct AppState {
    pub exporter: Arc<SwiftExporter>,
    pub telemetry_path: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let telemetry_path = state.telemetry_path.clone();
    Router::new()
        .route(&telemetry_path, get(metrics))
        .route("/", get(landing_page))
        .with_state(state)
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut collected = state.exporter.collect().await;
    collected.push(build_info_metric());
    let payload = render_exposition(&collected);

    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );

    response
}

async fn landing_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let version = env!("CARGO_PKG_VERSION");
    Html(format!(
        "<html>\n\
         <head><title>Swift Exporter v{version}</title></head>\n\
         <body>\n\
         <h1>Swift Exporter {version}</h1>\n\
         <p><a href='{}'>Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        state.telemetry_path
    ))
}

fn build_info_metric() -> CollectedMetric {
    CollectedMetric {
        descriptor: MetricDescriptor {
            name: "swift_exporter_build_info".to_string(),
            help: "swift exporter build info".to_string(),
            metric_type: MetricType::Gauge,
            variable_labels: vec!["version".to_string()],
        },
        samples: vec![MetricSample {
            labels: vec![(
                "version".to_string(),
                env!("CARGO_PKG_VERSION").to_string(),
            )],
            value: 1.0,
        }],
    }
}

#[cfg(test)]
mod tests {
    use crate::encoding::render_exposition;

    use super::build_info_metric;

    #[test]
    fn build_info_reports_package_version() {
        let metric = build_info_metric();
        assert_eq!(metric.samples.len(), 1);
        assert_eq!(metric.samples[0].value, 1.0);

        let rendered = render_exposition(&[metric]);
        assert!(rendered.contains(&format!(
            "swift_exporter_build_info{{version=\"{}\"}} 1",
            env!("CARGO_PKG_VERSION")
        )));
    }
}
