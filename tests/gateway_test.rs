//! HTTP 网关集成测试

mod common;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{shared, test_config, ScriptedLlm, StubLoader};
use quiz_solver::services::{AttemptLog, AttemptRecord};
use quiz_solver::{build_router, AppState, Config, Job, JobDispatcher, JobSink, QuizFlow};

/// 只记录任务，不执行
#[derive(Default)]
struct RecordingSink {
    jobs: Mutex<Vec<Job>>,
}

impl JobSink for RecordingSink {
    fn dispatch(&self, job: Job) -> anyhow::Result<()> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

struct FailingSink;

impl JobSink for FailingSink {
    fn dispatch(&self, _job: Job) -> anyhow::Result<()> {
        Err(anyhow!("dispatcher unavailable"))
    }
}

struct PanickingSink;

impl JobSink for PanickingSink {
    fn dispatch(&self, _job: Job) -> anyhow::Result<()> {
        panic!("boom")
    }
}

fn router_with(sink: Arc<dyn JobSink>) -> Router {
    build_router(AppState {
        config: Arc::new(test_config()),
        dispatcher: sink,
        attempt_log: None,
    })
}

/// 使用真实分发器和解题流程，页面加载器是桩
fn router_with_loader(loader: Arc<StubLoader>) -> Router {
    let config = Arc::new(test_config());
    let flow = Arc::new(QuizFlow::new(
        config.clone(),
        loader,
        shared(ScriptedLlm::failing()),
        reqwest::Client::new(),
    ));
    build_router(AppState {
        config,
        dispatcher: Arc::new(JobDispatcher::new(flow)),
        attempt_log: None,
    })
}

fn post_json(uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_accepts_valid_request() {
    let sink = Arc::new(RecordingSink::default());
    let app = router_with(sink.clone());

    let response = app
        .oneshot(post_json(
            "/api/v1/quiz/solve",
            r#"{"email": "a@b.com", "secret": "S", "url": "http://example/demo"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({
            "status": "accepted",
            "message": "Quiz solving started",
            "url": "http://example/demo"
        })
    );

    let jobs = sink.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].url, "http://example/demo");
    assert_eq!(jobs[0].secret, "S");
}

#[tokio::test]
async fn test_legacy_route_and_email_mismatch_still_accepted() {
    let sink = Arc::new(RecordingSink::default());
    let app = router_with(sink.clone());

    let response = app
        .oneshot(post_json(
            "/quiz",
            r#"{"email": "someone@else.com", "secret": "S", "url": "https://quiz.example/q1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(sink.jobs.lock().unwrap()[0].email, "someone@else.com");
}

#[tokio::test]
async fn test_wrong_secret_is_forbidden_and_loader_never_runs() {
    let loader = shared(StubLoader::new());
    let app = router_with_loader(loader.clone());

    let response = app
        .oneshot(post_json(
            "/api/v1/quiz/solve",
            r#"{"email": "a@b.com", "secret": "wrong", "url": "http://example/demo"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json(response).await, json!({ "error": "Invalid secret" }));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn test_acknowledges_before_slow_pipeline_finishes() {
    let loader = shared(StubLoader::new().with_delay(Duration::from_secs(5)));
    let app = router_with_loader(loader.clone());

    let started = Instant::now();
    let response = app
        .oneshot(post_json(
            "/api/v1/quiz/solve",
            r#"{"email": "a@b.com", "secret": "S", "url": "http://example/demo"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(started.elapsed() < Duration::from_secs(1));

    // 后台任务已经开始加载页面
    let mut waited = Duration::ZERO;
    while loader.calls() == 0 && waited < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = router_with(Arc::new(RecordingSink::default()));

    let response = app
        .oneshot(post_json("/api/v1/quiz/solve", "{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_missing_field_is_bad_request() {
    let sink = Arc::new(RecordingSink::default());
    let app = router_with(sink.clone());

    let response = app
        .oneshot(post_json(
            "/api/v1/quiz/solve",
            r#"{"email": "a@b.com", "secret": "S"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(sink.jobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_non_http_url_is_bad_request() {
    let app = router_with(Arc::new(RecordingSink::default()));

    let response = app
        .oneshot(post_json(
            "/api/v1/quiz/solve",
            r#"{"email": "a@b.com", "secret": "S", "url": "file:///etc/passwd"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dispatch_failure_is_internal_error() {
    let app = router_with(Arc::new(FailingSink));

    let response = app
        .oneshot(post_json(
            "/api/v1/quiz/solve",
            r#"{"email": "a@b.com", "secret": "S", "url": "http://example/demo"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(read_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("dispatcher unavailable"));
}

#[tokio::test]
async fn test_handler_panic_is_internal_error() {
    let app = router_with(Arc::new(PanickingSink));

    let response = app
        .oneshot(post_json(
            "/api/v1/quiz/solve",
            r#"{"email": "a@b.com", "secret": "S", "url": "http://example/demo"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(read_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_health() {
    let app = router_with(Arc::new(RecordingSink::default()));

    for uri in ["/", "/api/v1/quiz/health"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["message"], "LLM Analysis Quiz API");
        assert_eq!(body["email"], "a@b.com");
    }
}

#[tokio::test]
async fn test_stats_reads_attempt_log() {
    let dir = tempfile::tempdir().unwrap();
    let log = AttemptLog::new(dir.path().join("attempts.jsonl"));
    for (correct, elapsed) in [(true, 3.0), (false, 5.0)] {
        log.append(&AttemptRecord {
            timestamp: Utc::now(),
            quiz_url: "https://quiz.example/q".to_string(),
            answer: json!(1),
            answer_type: "integer".to_string(),
            correct,
            reason: None,
            elapsed_secs: elapsed,
            next_url: None,
        })
        .await
        .unwrap();
    }

    let app = build_router(AppState {
        config: Arc::new(Config {
            attempt_log_file: Some(log.path().to_path_buf()),
            ..test_config()
        }),
        dispatcher: Arc::new(RecordingSink::default()),
        attempt_log: Some(log),
    });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/quiz/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({
            "total_attempts": 2,
            "correct": 1,
            "incorrect": 1,
            "success_rate": 50.0,
            "avg_time": 4.0
        })
    );
}
