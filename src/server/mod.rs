//! HTTP surface of the sentiment service.
//!
//! | Method | Path | Body |
//! |---|---|---|
//! | `POST` | `/sentiment` | `{"text": "..."}` -> `{"sentiment": "POS" \| "NEU" \| "NEG", "score": 0.9731}` |
//! | `GET` | `/health` | -> `{"status": "ok", "model": "...", "device": "cpu"}` |
//!
//! Errors are returned as `{"detail": "..."}` with 400 (malformed JSON),
//! 415 (missing JSON content type), 422 (missing or mistyped `text`),
//! 500 (inference failure) or 504 (request timeout).
//!
//! Request bodies are not size-limited; overlong text is truncated by the
//! tokenizer instead of being rejected.

pub mod error;
pub mod routes;

pub use error::{ApiError, ErrorBody};
pub use routes::{ClassificationRequest, HealthResponse};

use crate::pipelines::sentiment_analysis_pipeline::{SentimentAnalysisModel, SentimentAnalysisPipeline};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// State shared by all handlers. The pipeline is never mutated after startup.
pub struct AppState<M: SentimentAnalysisModel> {
    pub pipeline: Arc<SentimentAnalysisPipeline<M>>,
    pub request_timeout: Option<Duration>,
}

impl<M: SentimentAnalysisModel> AppState<M> {
    pub fn new(pipeline: SentimentAnalysisPipeline<M>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl<M: SentimentAnalysisModel> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            request_timeout: self.request_timeout,
        }
    }
}

/// Build the service router.
pub fn router<M>(state: AppState<M>) -> Router
where
    M: SentimentAnalysisModel + Send + Sync + 'static,
{
    Router::new()
        .route("/sentiment", post(routes::classify::<M>))
        .route("/health", get(routes::health::<M>))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::sentiment_analysis_pipeline::pipeline::test_support::{
        fixed_pipeline, whitespace_tokenizer, FixedLogitsModel,
    };
    use crate::pipelines::sentiment_analysis_pipeline::{ClassificationResponse, Sentiment};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use candle_core::{Device, Tensor};
    use tokenizers::Tokenizer;
    use tower::ServiceExt;

    /// Sleeps before answering so requests outlive a short timeout.
    #[derive(Clone)]
    struct SlowModel {
        inner: FixedLogitsModel,
        delay: Duration,
    }

    impl SentimentAnalysisModel for SlowModel {
        type Options = Vec<f32>;

        async fn new(options: Self::Options, device: Device) -> anyhow::Result<Self> {
            Ok(Self {
                inner: FixedLogitsModel::new(options, device).await?,
                delay: Duration::from_millis(300),
            })
        }

        async fn get_tokenizer(options: Self::Options) -> anyhow::Result<Tokenizer> {
            FixedLogitsModel::get_tokenizer(options).await
        }

        fn logits(&self, input_ids: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
            std::thread::sleep(self.delay);
            self.inner.logits(input_ids, attention_mask)
        }

        fn model_id(&self) -> &str {
            "test/slow"
        }

        fn device(&self) -> &Device {
            self.inner.device()
        }
    }

    fn slow_app(timeout: Option<Duration>) -> Router {
        let model = SlowModel {
            inner: FixedLogitsModel {
                logits: vec![0.0, 0.0, 0.0, 0.0, 4.0],
                device: Device::Cpu,
            },
            delay: Duration::from_millis(300),
        };
        let pipeline = SentimentAnalysisPipeline::from_parts(
            model,
            whitespace_tokenizer().unwrap(),
            crate::pipelines::sentiment_analysis_pipeline::DEFAULT_MAX_LENGTH,
        )
        .unwrap();
        router(AppState::new(pipeline).with_request_timeout(timeout))
    }

    fn app(logits: &[f32]) -> Router {
        router(AppState::new(fixed_pipeline(logits)))
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/sentiment")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn sentiment_returns_label_and_score() {
        let response = app(&[0.0, 0.0, 0.0, 1.0, 4.0])
            .oneshot(post_json(r#"{"text": "good"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = read_json(response).await;
        assert_eq!(body["sentiment"], "POS");
        let score = body["score"].as_f64().unwrap();
        assert!(score > 0.5 && score <= 1.0);
    }

    #[tokio::test]
    async fn empty_text_is_accepted() {
        let response = app(&[0.0, 3.0, 0.0, 0.0, 0.0])
            .oneshot(post_json(r#"{"text": ""}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: ClassificationResponse = read_json(response).await;
        assert_eq!(body.sentiment, Sentiment::Negative);
    }

    #[tokio::test]
    async fn missing_text_is_unprocessable() {
        let response = app(&[0.0; 5])
            .oneshot(post_json(r#"{"content": "hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ErrorBody = read_json(response).await;
        assert!(body.detail.contains("text"));
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let response = app(&[0.0; 5])
            .oneshot(post_json(r#"{"text": "#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_content_type_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/sentiment")
            .body(Body::from(r#"{"text": "good"}"#))
            .unwrap();
        let response = app(&[0.0; 5]).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn inference_failure_is_server_error() {
        let response = app(&[0.5, 0.5])
            .oneshot(post_json(r#"{"text": "good"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = read_json(response).await;
        assert!(body.detail.contains("expected 5 class scores"));
    }

    #[tokio::test]
    async fn health_reports_model_and_device() {
        let response = app(&[0.0; 5])
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: HealthResponse = read_json(response).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.model, "test/fixed-logits");
        assert_eq!(body.device, "cpu");
    }

    #[tokio::test]
    async fn repeated_requests_give_identical_responses() {
        let app = app(&[0.2, 0.1, 1.3, 0.4, 0.0]);
        let first: ClassificationResponse = read_json(
            app.clone()
                .oneshot(post_json(r#"{"text": "good bad"}"#))
                .await
                .unwrap(),
        )
        .await;
        let second: ClassificationResponse = read_json(
            app.oneshot(post_json(r#"{"text": "good bad"}"#))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(first, second);
        assert_eq!(first.sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn body_over_default_limit_is_accepted() {
        let text = "good ".repeat(600_000);
        let body = serde_json::json!({ "text": text }).to_string();
        assert!(body.len() > 2 * 1024 * 1024);

        let response = app(&[0.0, 0.0, 0.0, 0.0, 4.0])
            .oneshot(post_json(&body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: ClassificationResponse = read_json(response).await;
        assert_eq!(body.sentiment, Sentiment::Positive);
    }

    #[tokio::test]
    async fn slow_classification_times_out() {
        let response = slow_app(Some(Duration::from_millis(1)))
            .oneshot(post_json(r#"{"text": "good"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body: ErrorBody = read_json(response).await;
        assert!(body.detail.contains("did not finish"), "detail was {}", body.detail);
    }

    #[tokio::test]
    async fn slow_classification_completes_without_timeout() {
        let response = slow_app(None)
            .oneshot(post_json(r#"{"text": "good"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn state_clone_shares_pipeline() {
        let state: AppState<FixedLogitsModel> =
            AppState::new(fixed_pipeline(&[0.0; 5])).with_request_timeout(None);
        let clone = state.clone();
        assert!(Arc::ptr_eq(&state.pipeline, &clone.pipeline));
    }
}
