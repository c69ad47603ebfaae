use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use crate::metrics::{MetricsReport, MetricsSink};

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn index() -> &'static str {
    "msg-relay metrics server"
}

pub async fn metrics(State(metrics): State<Arc<dyn MetricsSink>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        metrics.snapshot().to_prometheus(),
    )
}

pub async fn metrics_json(State(metrics): State<Arc<dyn MetricsSink>>) -> Json<MetricsReport> {
    Json(metrics.snapshot().report())
}

#[cfg(test)]
mod tests {
    use crate::api::create_router;
    use crate::metrics::{MessageMetrics, MetricsSink};
    use crate::proxy::MessageType;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn get(metrics: Arc<MessageMetrics>, uri: &str) -> (StatusCode, String) {
        let response = create_router(metrics)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_prometheus_endpoint() {
        let metrics = Arc::new(MessageMetrics::new());
        metrics.increment(MessageType::Ack);

        let (status, body) = get(metrics, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"msg_counter{type="ACK"} 1"#));
    }

    #[tokio::test]
    async fn test_json_endpoint() {
        let metrics = Arc::new(MessageMetrics::new());
        metrics.increment(MessageType::Req);
        metrics.increment(MessageType::Req);
        metrics.increment(MessageType::Nak);

        let (status, body) = get(metrics, "/metrics.json").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["msg_req"], 2);
        assert_eq!(json["msg_nak"], 1);
        assert_eq!(json["msg_ack"], 0);
        assert_eq!(json["msg_total"], 3);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = get(Arc::new(MessageMetrics::new()), "/flows").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
