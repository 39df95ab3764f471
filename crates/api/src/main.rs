mod config;
mod metrics;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pipeline::{
    InvestigationState, Pipeline, PipelineError, PipelineEvent, StageOutput, SubjectProfile,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, info_span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::metrics::{Metrics, MetricsSnapshot};

struct AppState {
    pipeline: Arc<Pipeline>,
    llm_base_url: String,
    llm_model: String,
    metrics: Arc<Metrics>,
}

#[derive(Serialize)]
struct HealthResponse {
    llm: String,
    model: String,
}

#[derive(Deserialize)]
struct InvestigateRequest {
    subject: SubjectProfile,
    /// Optional starting record. It must carry a full `subject` to parse, but
    /// that inner subject is always replaced by the top-level `subject`.
    state: Option<InvestigationState>,
}

#[derive(Serialize)]
struct InvestigateResponse {
    run_id: Uuid,
    stages: Vec<StageOutput>,
    state: InvestigationState,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        let status = match e {
            PipelineError::InvalidSubject(_) | PipelineError::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load()?;

    let client = config.build_client()?;
    let pipeline = Pipeline::standard(Arc::new(client), &config.pipeline)?;

    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        llm_base_url: config.llm.base_url.clone(),
        llm_model: config.llm.model.clone(),
        metrics: Metrics::new(),
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    info!("Server listening on http://{}", config.listen_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// `RUST_LOG` filters (default `info`); `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check).post(health_check))
        .route("/investigate", post(investigate))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let llm_status = match reqwest::get(format!("{}/api/tags", state.llm_base_url)).await {
        Ok(resp) if resp.status().is_success() => "ok".to_string(),
        Ok(resp) => format!("error: status {}", resp.status()),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse {
        llm: llm_status,
        model: state.llm_model.clone(),
    })
}

async fn investigate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InvestigateRequest>,
) -> Result<Json<InvestigateResponse>, ApiError> {
    let run_id = Uuid::new_v4();
    let record = match req.state {
        Some(mut initial) => {
            initial.subject = req.subject;
            initial
        }
        None => InvestigationState::new(req.subject),
    };

    state.metrics.record_started();
    info!(%run_id, subject = %record.subject.name, "Investigation requested");

    let (tx, mut rx) = mpsc::channel(16);
    let pipeline = state.pipeline.clone();
    let handle = tokio::spawn(
        async move { pipeline.run_with_events(record, tx).await }
            .instrument(info_span!("investigation", %run_id)),
    );

    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::StageCompleted(output) => {
                info!(
                    %run_id,
                    stage = %output.stage,
                    elapsed_ms = output.elapsed_ms,
                    fields = ?output.update.fields(),
                    "Stage output"
                );
                state.metrics.record_stage(&output);
            }
            PipelineEvent::Finished => info!(%run_id, "Investigation reached terminal state"),
        }
    }

    let result = handle.await.map_err(|e| {
        error!(%run_id, error = %e, "Investigation task panicked");
        state.metrics.record_failure();
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "investigation task failed".to_string(),
        }
    })?;

    match result {
        Ok(run) => {
            state.metrics.record_success(&run);
            Ok(Json(InvestigateResponse {
                run_id,
                stages: run.stages,
                state: run.state,
            }))
        }
        Err(e) => {
            error!(%run_id, error = %e, "Investigation failed");
            state.metrics.record_failure();
            Err(e.into())
        }
    }
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use extract::ResultShape;
    use extract::testing::ScriptedClient;
    use pipeline::PipelineConfig;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let client = Arc::new(ScriptedClient::new(|_, shape| {
            Ok(match shape {
                ResultShape::Documents => json!({"results": [{
                    "url": "https://news.example/1",
                    "title": "Acme Corp sued",
                    "raw_content": "Acme Corp sued by Beta Inc",
                    "source": "news.example",
                }]}),
                ResultShape::Entities => json!({"entities": [{"name": "Beta Inc", "type": "Company"}]}),
                ResultShape::Relationships => json!({"relationships": []}),
            })
        }));
        let config = PipelineConfig { deep_search_delay_ms: 0, ..Default::default() };
        let pipeline = Pipeline::standard(client, &config).unwrap();

        router(Arc::new(AppState {
            pipeline: Arc::new(pipeline),
            llm_base_url: "http://127.0.0.1:9".to_string(),
            llm_model: "test".to_string(),
            metrics: Metrics::new(),
        }))
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn investigate_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/investigate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_investigate_returns_final_state() {
        let (status, body) = call(
            app(),
            investigate_request(json!({
                "subject": {"name": "Acme Corp", "entity_type": "organization", "locations": ["NY"]}
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stages"].as_array().unwrap().len(), 5);
        assert_eq!(body["stages"][0]["stage"], "web_search");
        assert_eq!(body["state"]["documents"].as_array().unwrap().len(), 1);
        assert_eq!(body["state"]["summarized_entities"][0]["name"], "Beta Inc");
        assert_eq!(body["state"]["risks"][0]["category"], "Legal");
    }

    #[tokio::test]
    async fn test_blank_subject_is_bad_request() {
        let (status, body) = call(
            app(),
            investigate_request(json!({"subject": {"name": " ", "entity_type": "person"}})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("subject"));
    }

    #[tokio::test]
    async fn test_stats_count_runs() {
        let app = app();
        call(
            app.clone(),
            investigate_request(json!({"subject": {"name": "Acme Corp", "entity_type": "company"}})),
        )
        .await;

        let (status, body) = call(
            app,
            Request::builder().uri("/stats").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["investigations_started"], 1);
        assert_eq!(body["investigations_succeeded"], 1);
        assert_eq!(body["documents_found"], 1);
        assert_eq!(body["risks_found"], 1);
    }

    #[tokio::test]
    async fn test_initial_state_subject_is_replaced() {
        let (status, body) = call(
            app(),
            investigate_request(json!({
                "subject": {"name": "Acme Corp", "entity_type": "organization"},
                "state": {
                    "subject": {"name": "Someone Else", "entity_type": "person"},
                    "documents": [],
                    "extracted_entities": [],
                    "summarized_entities": [],
                    "relationships": [],
                    "risks": []
                }
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["subject"]["name"], "Acme Corp");
        assert_eq!(body["state"]["subject"]["entity_type"], "organization");
    }
}
