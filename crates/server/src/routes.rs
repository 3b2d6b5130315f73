//! HTTP routes for the extraction API.

use std::time::Duration;

use axum::extract::{DefaultBodyLimit, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use declutter_core::{
    Article, Declutter, DeclutterConfig, ExtractionMode, fetch_url, readability::DEFAULT_MAX_CONTENT_BYTES,
    validate_markup, validate_url,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use url::Url;

use crate::error::ApiError;

const TEST_CONTENT: &str = include_str!("../assets/test_content.html");
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_FILE_NAME: &str = "uploaded file";

/// Shared state: the base pipeline configuration
#[derive(Clone, Default)]
pub struct AppState {
    pub config: DeclutterConfig,
}

impl AppState {
    fn declutter(&self, mode: Option<ExtractionMode>) -> Declutter {
        let mut config = self.config.clone();
        if let Some(mode) = mode {
            config.mode = mode;
        }
        Declutter::with_config(config)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub url: String,
    pub mode: Option<ExtractionMode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeFileRequest {
    pub html_content: String,
    pub file_name: Option<String>,
    pub mode: Option<ExtractionMode>,
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub mode: ExtractionMode,
    pub title: Option<String>,
    pub original_content: String,
    pub optimized_content: String,
    pub unresolved_images: Vec<String>,
}

impl OptimizeResponse {
    fn new(original_content: String, article: Article) -> Self {
        Self {
            success: true,
            url: None,
            file_name: None,
            mode: article.mode,
            title: article.title,
            original_content,
            optimized_content: article.content,
            unresolved_images: article.unresolved_images,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/test-content", get(test_content))
        .route("/api/optimize", post(optimize))
        .route("/api/optimize-file", post(optimize_file))
        .layer(DefaultBodyLimit::max(DEFAULT_MAX_CONTENT_BYTES))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    Json(HealthResponse { status: "OK", timestamp })
}

async fn test_content() -> Html<&'static str> {
    Html(TEST_CONTENT)
}

/// Run extraction off the async executor
async fn extract(declutter: Declutter, html: String, base: Option<Url>) -> Result<(String, Article), ApiError> {
    tokio::task::spawn_blocking(move || -> Result<(String, Article), ApiError> {
        let source = base.as_ref().map(Url::to_string);
        let extraction = declutter.extract(&html, base)?;
        let article = Article::from_extraction(&extraction, source);
        Ok((html, article))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("extraction task failed: {e}")))?
}

async fn optimize(
    State(state): State<AppState>, Json(request): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, ApiError> {
    if request.url.trim().is_empty() {
        return Err(ApiError::BadRequest("URL is required".to_string()));
    }
    let url = validate_url(request.url.trim())?;
    let declutter = state.declutter(request.mode);
    info!(url = url.as_str(), mode = %declutter.config().mode, "optimizing URL");

    let html = fetch_url(url.as_str(), &declutter.config().fetch).await?;
    let (original, article) = extract(declutter, html, Some(url.clone())).await?;

    Ok(Json(OptimizeResponse { url: Some(url.to_string()), ..OptimizeResponse::new(original, article) }))
}

async fn optimize_file(
    State(state): State<AppState>, Json(request): Json<OptimizeFileRequest>,
) -> Result<Json<OptimizeResponse>, ApiError> {
    if request.html_content.trim().is_empty() {
        return Err(ApiError::BadRequest("HTML content is required".to_string()));
    }
    validate_markup(&request.html_content)?;

    let base = match request.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(raw) => Some(validate_url(raw)?),
        None => None,
    };
    let file_name = request.file_name.unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
    let declutter = state.declutter(request.mode);
    info!(file = file_name.as_str(), mode = %declutter.config().mode, "optimizing uploaded file");

    let (original, article) = extract(declutter, request.html_content, base).await?;
    Ok(Json(OptimizeResponse { file_name: Some(file_name), ..OptimizeResponse::new(original, article) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = router(AppState::default()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Request::get("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert!(OffsetDateTime::parse(body["timestamp"].as_str().unwrap(), &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn test_test_content_is_html() {
        let response = router(AppState::default())
            .oneshot(Request::get("/api/test-content").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_optimize_file() {
        let request = post_json(
            "/api/optimize-file",
            json!({ "htmlContent": TEST_CONTENT, "fileName": "bridge.html", "baseUrl": "https://news.example.org/city/" }),
        );
        let (status, body) = send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["fileName"], "bridge.html");
        assert_eq!(body["mode"], "heuristic");
        assert_eq!(body["title"], "Rebuilding the Harbor Bridge");
        let optimized = body["optimizedContent"].as_str().unwrap();
        assert!(optimized.contains("https://news.example.org/media/crew.jpg"));
        assert!(!optimized.contains("Limited offer"));
        assert_eq!(body["unresolvedImages"], json!(["../archive/1925.jpg"]));
        assert!(body.get("url").is_none());
    }

    #[tokio::test]
    async fn test_optimize_file_defaults_name() {
        let (status, body) = send(post_json("/api/optimize-file", json!({ "htmlContent": TEST_CONTENT }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fileName"], "uploaded file");
    }

    #[tokio::test]
    async fn test_optimize_file_rejects_non_markup() {
        let (status, body) =
            send(post_json("/api/optimize-file", json!({ "htmlContent": "plain words without any tags" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("HTML"));
    }

    #[tokio::test]
    async fn test_optimize_file_requires_content() {
        let (status, body) = send(post_json("/api/optimize-file", json!({ "htmlContent": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "HTML content is required");
    }

    #[tokio::test]
    async fn test_optimize_file_without_readable_content() {
        let html = "<html><body><nav>Home</nav><footer>Copyright</footer></body></html>";
        let (status, _) = send(post_json("/api/optimize-file", json!({ "htmlContent": html }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_optimize_rejects_invalid_url() {
        let (status, body) = send(post_json("/api/optimize", json!({ "url": "ftp://example.com/file" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid URL"));
    }

    #[tokio::test]
    async fn test_optimize_rejects_unknown_mode() {
        let request = post_json("/api/optimize", json!({ "url": "https://example.com", "mode": "magic" }));
        let response = router(AppState::default()).oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_optimize_url() {
        let server = httpmock::MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/city/harbor-bridge");
                then.status(200).header("content-type", "text/html").body(TEST_CONTENT);
            })
            .await;

        let url = server.url("/city/harbor-bridge");
        let (status, body) = send(post_json("/api/optimize", json!({ "url": url }))).await;

        mock.assert_hits_async(1).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], url);
        assert!(body["optimizedContent"].as_str().unwrap().contains("Working at night"));
        assert!(body.get("fileName").is_none());
    }

    #[tokio::test]
    async fn test_optimize_tiny_upstream_body_is_bad_request() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.path("/tiny");
                then.status(200).body("<p>x</p>");
            })
            .await;

        let (status, body) = send(post_json("/api/optimize", json!({ "url": server.url("/tiny") }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("too small"), "{body}");
    }

    #[tokio::test]
    async fn test_optimize_refused_upstream_is_bad_gateway() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (status, body) = send(post_json("/api/optimize", json!({ "url": format!("http://127.0.0.1:{port}/") }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["suggestion"].is_string(), "{body}");
    }
}
