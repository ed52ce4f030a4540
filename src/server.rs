use std::sync::Arc;

use actix_cors::Cors;
use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer, Responder, ResponseError, get, middleware::Logger,
    post, web,
};
use anyhow::Result;
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::config::{AllowList, CorsConfig, ServerConfig};
use crate::dto::{ErrorResponse, HealthResponse, TranscriptRequest, TranscriptResponse, TranscriptSegment};
use crate::transcript::{FetchedTranscript, TranscriptFetcher};
use crate::youtube::fetcher::YouTubeFetcher;

pub const SERVICE_MESSAGE: &str = "FactFinder Agent Server Running";

pub struct AppState {
    pub fetcher: Arc<dyn TranscriptFetcher>,
}

/// Errors surfaced to HTTP callers as `{"detail": ...}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body did not match `{"video_id": string}`.
    #[error("{0}")]
    InvalidRequest(String),

    /// Any failure from the transcript source. Every kind maps to 400.
    #[error("{0}")]
    Fetch(anyhow::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Fetch(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            detail: self.to_string(),
        })
    }
}

#[get("/")]
pub async fn health_check() -> impl Responder {
    debug!("Health check endpoint called");
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        message: SERVICE_MESSAGE.to_string(),
    })
}

#[post("/transcript")]
pub async fn get_transcript(
    data: web::Data<AppState>,
    request: web::Json<TranscriptRequest>,
) -> Result<HttpResponse, ApiError> {
    let TranscriptRequest { video_id } = request.into_inner();
    debug!("Transcript request received for {video_id}");

    let transcript = data.fetcher.fetch(&video_id).await.map_err(|e| {
        error!("Error fetching transcript: {e}");
        ApiError::Fetch(e)
    })?;

    info!(
        "Returning {} transcript segments for {} ({} [{}], generated={})",
        transcript.snippets.len(),
        transcript.video_id,
        transcript.language,
        transcript.language_code,
        transcript.is_generated
    );
    let segments = to_segments(transcript);

    Ok(HttpResponse::Ok().json(TranscriptResponse {
        transcript: segments,
    }))
}

fn to_segments(transcript: FetchedTranscript) -> Vec<TranscriptSegment> {
    transcript
        .snippets
        .into_iter()
        .map(|snippet| TranscriptSegment {
            text: snippet.text,
            start: snippet.start,
            duration: snippet.duration,
        })
        .collect()
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("Rejected malformed transcript request: {err}");
    ApiError::InvalidRequest(err.to_string()).into()
}

/// Registers the routes and the JSON extractor settings they rely on.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(health_check)
        .service(get_transcript);
}

pub fn build_cors(config: &CorsConfig) -> Cors {
    let mut cors = match &config.allowed_origins {
        AllowList::Any => Cors::default().allow_any_origin(),
        AllowList::Only(origins) => origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin)),
    };
    cors = match &config.allowed_methods {
        AllowList::Any => cors.allow_any_method(),
        AllowList::Only(methods) => cors.allowed_methods(methods.iter().map(String::as_str)),
    };
    cors = match &config.allowed_headers {
        AllowList::Any => cors.allow_any_header(),
        AllowList::Only(headers) => cors.allowed_headers(headers.iter().map(String::as_str)),
    };
    if config.allow_credentials {
        cors = cors.supports_credentials();
    }
    cors.max_age(config.max_age)
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    info!("Initializing YouTube transcript fetcher...");
    info!(
        "Using configuration: youtube_url={}, cors_origins={:?}, cors_credentials={}",
        config.youtube.base_url, config.cors.allowed_origins, config.cors.allow_credentials
    );

    let fetcher = YouTubeFetcher::new(config.youtube.clone())?;
    let app_state = web::Data::new(AppState {
        fetcher: Arc::new(fetcher),
    });
    let cors_config = config.cors.clone();

    info!(
        "🚀 Starting FactFinder Agent Server on http://{}:{}",
        config.host, config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(build_cors(&cors_config))
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptSnippet;
    use actix_web::http::{Method, header};
    use actix_web::test;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubFetcher {
        outcome: Result<Vec<TranscriptSnippet>, String>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn returning(snippets: &[(&str, f64, f64)]) -> Arc<Self> {
            let snippets = snippets
                .iter()
                .map(|(text, start, duration)| TranscriptSnippet {
                    text: text.to_string(),
                    start: *start,
                    duration: *duration,
                })
                .collect();
            Arc::new(Self {
                outcome: Ok(snippets),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                outcome: Err(message.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TranscriptFetcher for StubFetcher {
        async fn fetch(&self, video_id: &str) -> anyhow::Result<FetchedTranscript> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Ok(snippets) => Ok(FetchedTranscript {
                    video_id: video_id.to_string(),
                    language: "English".to_string(),
                    language_code: "en".to_string(),
                    is_generated: false,
                    snippets: snippets.clone(),
                }),
                Err(message) => Err(anyhow::anyhow!(message.clone())),
            }
        }
    }

    fn app_state(fetcher: &Arc<StubFetcher>) -> web::Data<AppState> {
        web::Data::new(AppState {
            fetcher: fetcher.clone(),
        })
    }

    #[actix_web::test]
    async fn health_check_reports_ok() {
        let fetcher = StubFetcher::failing("unused");
        let app = test::init_service(
            App::new().app_data(app_state(&fetcher)).configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "status": "ok", "message": SERVICE_MESSAGE }));
        assert_eq!(fetcher.calls(), 0);
    }

    #[actix_web::test]
    async fn returns_reshaped_transcript() {
        let fetcher = StubFetcher::returning(&[("Hello", 0.0, 1.2), ("World", 1.2, 0.8)]);
        let app = test::init_service(
            App::new().app_data(app_state(&fetcher)).configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/transcript")
            .set_json(json!({ "video_id": "abc123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = test::read_body(resp).await;
        assert_eq!(
            body,
            r#"{"transcript":[{"text":"Hello","start":0.0,"duration":1.2},{"text":"World","start":1.2,"duration":0.8}]}"#
        );
        assert_eq!(fetcher.calls(), 1);
    }

    #[actix_web::test]
    async fn keeps_chronological_order_and_exact_fields() {
        let fetcher = StubFetcher::returning(&[
            ("one", 0.0, 2.0),
            ("two", 2.0, 1.5),
            ("two again", 2.0, 0.5),
            ("three", 4.25, 3.0),
        ]);
        let app = test::init_service(
            App::new().app_data(app_state(&fetcher)).configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/transcript")
            .set_json(json!({ "video_id": "ordered" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let segments = body["transcript"].as_array().unwrap();
        assert_eq!(segments.len(), 4);
        let starts: Vec<f64> = segments.iter().map(|s| s["start"].as_f64().unwrap()).collect();
        assert!(starts.windows(2).all(|pair| pair[0] <= pair[1]));
        for segment in segments {
            let fields = segment.as_object().unwrap();
            assert_eq!(fields.len(), 3);
            assert!(!fields["text"].as_str().unwrap().is_empty());
            assert!(fields["start"].as_f64().unwrap() >= 0.0);
            assert!(fields["duration"].as_f64().unwrap() >= 0.0);
        }
    }

    #[actix_web::test]
    async fn fetch_failure_is_a_client_error_with_detail() {
        let fetcher = StubFetcher::failing("No transcripts available");
        let app = test::init_service(
            App::new().app_data(app_state(&fetcher)).configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/transcript")
            .set_json(json!({ "video_id": "nocaps" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = test::read_body(resp).await;
        assert_eq!(body, r#"{"detail":"No transcripts available"}"#);
    }

    #[actix_web::test]
    async fn malformed_bodies_never_reach_the_fetcher() {
        let fetcher = StubFetcher::returning(&[("Hello", 0.0, 1.0)]);
        let app = test::init_service(
            App::new().app_data(app_state(&fetcher)).configure(configure),
        )
        .await;

        let missing = test::TestRequest::post()
            .uri("/transcript")
            .set_json(json!({}))
            .to_request();
        let wrong_type = test::TestRequest::post()
            .uri("/transcript")
            .set_json(json!({ "video_id": 42 }))
            .to_request();
        let not_json = test::TestRequest::post()
            .uri("/transcript")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("video_id=abc123")
            .to_request();

        for req in [missing, wrong_type, not_json] {
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let body: Value = test::read_body_json(resp).await;
            assert!(!body["detail"].as_str().unwrap().is_empty());
        }
        assert_eq!(fetcher.calls(), 0);
    }

    #[actix_web::test]
    async fn echoes_any_origin_with_credentials() {
        let fetcher = StubFetcher::returning(&[("Hello", 0.0, 1.0)]);
        let app = test::init_service(
            App::new()
                .app_data(app_state(&fetcher))
                .wrap(build_cors(&CorsConfig::default()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/transcript")
            .insert_header((header::ORIGIN, "chrome-extension://abcdefghijklmnop"))
            .set_json(json!({ "video_id": "abc123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "chrome-extension://abcdefghijklmnop"
        );
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[actix_web::test]
    async fn answers_preflight_requests() {
        let fetcher = StubFetcher::returning(&[]);
        let app = test::init_service(
            App::new()
                .app_data(app_state(&fetcher))
                .wrap(build_cors(&CorsConfig::default()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/transcript")
            .insert_header((header::ORIGIN, "chrome-extension://abcdefghijklmnop"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "chrome-extension://abcdefghijklmnop"
        );
        assert_eq!(fetcher.calls(), 0);
    }

    #[actix_web::test]
    async fn restricted_origins_are_not_echoed() {
        let fetcher = StubFetcher::returning(&[]);
        let cors = CorsConfig {
            allowed_origins: AllowList::Only(vec!["chrome-extension://trusted".to_string()]),
            ..CorsConfig::default()
        };
        let app = test::init_service(
            App::new()
                .app_data(app_state(&fetcher))
                .wrap(build_cors(&cors))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://elsewhere.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
