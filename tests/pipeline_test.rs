//! 解题流程集成测试：桩页面 + 桩 LLM + mockito 题目网站

mod common;

use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::json;

use common::{shared, test_config, ScriptedLlm, StubLoader};
use quiz_solver::error::AppError;
use quiz_solver::models::{Answer, RenderedPage};
use quiz_solver::services::AttemptLog;
use quiz_solver::workflow::ChainStop;
use quiz_solver::{Config, Job, QuizFlow};

fn flow(config: Config, loader: Arc<StubLoader>, llm: Arc<ScriptedLlm>) -> QuizFlow {
    QuizFlow::new(Arc::new(config), loader, llm, reqwest::Client::new())
}

fn job(url: &str) -> Job {
    Job::new(url, "a@b.com", "S", Duration::from_secs(120))
}

fn parse_reply(submit_url: &str, sources: &[String], format: &str) -> String {
    json!({
        "question": "What is the answer?",
        "data_sources": sources,
        "submit_url": submit_url,
        "answer_format": format,
        "instructions": "Read the data and answer."
    })
    .to_string()
}

#[tokio::test]
async fn test_round_trip_submits_exact_payload() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut server = mockito::Server::new_async().await;
    let quiz_url = format!("{}/demo", server.url());
    let submit_url = format!("{}/submit", server.url());

    let submit = server
        .mock("POST", "/submit")
        .match_body(Matcher::Json(json!({
            "email": "a@b.com",
            "secret": "S",
            "url": quiz_url,
            "answer": 42
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"correct": true, "reason": null}"#)
        .expect(1)
        .create_async()
        .await;

    let loader = shared(StubLoader::new().with_page(RenderedPage::from_text(
        &quiz_url,
        format!("Q1. What is 6 * 7? POST your answer to {}", submit_url),
    )));
    let llm = shared(ScriptedLlm::new(
        vec![format!("```json\n{}\n```", parse_reply(&submit_url, &[], "number"))],
        vec!["42".to_string()],
    ));

    let report = flow(test_config(), loader.clone(), llm.clone())
        .run_chain(&job(&quiz_url))
        .await;

    submit.assert_async().await;
    assert_eq!(report.stop, ChainStop::Completed);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].answer, Answer::Integer(42));
    assert!(report.results[0].outcome.correct);
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_page_without_assets_answers_from_page_text() {
    let mut server = mockito::Server::new_async().await;
    let quiz_url = format!("{}/q-text", server.url());
    let submit_url = format!("{}/submit", server.url());

    let submit = server
        .mock("POST", "/submit")
        .match_body(Matcher::PartialJson(json!({ "answer": "Paris" })))
        .with_status(200)
        .with_body(r#"{"correct": true}"#)
        .create_async()
        .await;

    let loader = shared(StubLoader::new().with_page(RenderedPage::from_text(
        &quiz_url,
        "What is the capital of France?",
    )));
    let llm = shared(ScriptedLlm::new(
        vec![parse_reply(&submit_url, &[], "string")],
        vec!["\"Paris\"".to_string()],
    ));

    let report = flow(test_config(), loader, llm.clone())
        .run_chain(&job(&quiz_url))
        .await;

    submit.assert_async().await;
    assert_eq!(report.results.len(), 1);

    let solve = llm.solve_prompts();
    assert_eq!(solve.len(), 1);
    assert!(solve[0].user.contains("What is the capital of France?"));
    assert!(!solve[0].user.contains("Data source"));
    assert!(solve[0].images.is_empty());
}

#[tokio::test]
async fn test_unsupported_asset_is_skipped_and_csv_is_used() {
    let mut server = mockito::Server::new_async().await;
    let quiz_url = format!("{}/q-data", server.url());
    let submit_url = format!("{}/submit", server.url());
    let zip_url = format!("{}/archive.zip", server.url());
    let csv_url = format!("{}/data.csv", server.url());

    let _zip = server
        .mock("GET", "/archive.zip")
        .with_status(200)
        .with_header("content-type", "application/zip")
        .with_body("PK\x03\x04")
        .create_async()
        .await;
    let _csv = server
        .mock("GET", "/data.csv")
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body("name,value\na,10\nb,20\nc,30\n")
        .create_async()
        .await;
    let submit = server
        .mock("POST", "/submit")
        .match_body(Matcher::PartialJson(json!({ "answer": 60 })))
        .with_status(200)
        .with_body(r#"{"correct": true}"#)
        .create_async()
        .await;

    let loader = shared(StubLoader::new().with_page(RenderedPage::from_text(
        &quiz_url,
        "Sum the value column.",
    )));
    let llm = shared(ScriptedLlm::new(
        vec![parse_reply(&submit_url, &[zip_url.clone(), csv_url.clone()], "number")],
        vec!["60".to_string()],
    ));

    let report = flow(test_config(), loader, llm.clone())
        .run_chain(&job(&quiz_url))
        .await;

    submit.assert_async().await;
    assert_eq!(report.stop, ChainStop::Completed);

    let solve = llm.solve_prompts();
    assert!(solve[0].user.contains(&format!("Data source 1 [csv] {}", csv_url)));
    assert!(solve[0].user.contains("sum=60"));
    assert!(!solve[0].user.contains(&zip_url));
}

#[tokio::test]
async fn test_relative_links_on_page_are_collected() {
    let mut server = mockito::Server::new_async().await;
    let quiz_url = format!("{}/quiz/q-links", server.url());

    let _json = server
        .mock("GET", "/quiz/values.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"values": [1, 2, 3]}"#)
        .create_async()
        .await;
    let submit = server
        .mock("POST", "/submit")
        .with_status(200)
        .with_body(r#"{"correct": false, "reason": "Wrong answer"}"#)
        .create_async()
        .await;

    let page = RenderedPage {
        links: vec![
            format!("{}/quiz/values.json", server.url()),
            format!("{}/quiz/next", server.url()),
        ],
        ..RenderedPage::from_text(&quiz_url, "Count the values.")
    };
    let loader = shared(StubLoader::new().with_page(page));
    let llm = shared(ScriptedLlm::new(
        vec![parse_reply("/submit", &[], "number")],
        vec!["3".to_string()],
    ));

    let report = flow(test_config(), loader, llm.clone())
        .run_chain(&job(&quiz_url))
        .await;

    submit.assert_async().await;
    assert!(!report.results[0].outcome.correct);
    assert_eq!(
        report.results[0].outcome.reason.as_deref(),
        Some("Wrong answer")
    );

    let solve = llm.solve_prompts();
    assert!(solve[0].user.contains("[json]"));
    assert!(!solve[0].user.contains("/quiz/next"));
}

#[tokio::test]
async fn test_chain_follows_next_url_and_records_attempts() {
    let mut server = mockito::Server::new_async().await;
    let q1 = format!("{}/q1", server.url());
    let q2 = format!("{}/q2", server.url());
    let submit_url = format!("{}/submit", server.url());

    let first = server
        .mock("POST", "/submit")
        .match_body(Matcher::PartialJson(json!({ "url": q1 })))
        .with_status(200)
        .with_body(json!({ "correct": true, "url": q2 }).to_string())
        .create_async()
        .await;
    let second = server
        .mock("POST", "/submit")
        .match_body(Matcher::PartialJson(json!({ "url": q2 })))
        .with_status(200)
        .with_body(r#"{"correct": false, "reason": "nope"}"#)
        .create_async()
        .await;

    let loader = shared(
        StubLoader::new()
            .with_page(RenderedPage::from_text(&q1, "First question"))
            .with_page(RenderedPage::from_text(&q2, "Second question")),
    );
    let llm = shared(ScriptedLlm::new(
        vec![
            parse_reply(&submit_url, &[], "boolean"),
            parse_reply(&submit_url, &[], "number"),
        ],
        vec!["true".to_string(), "7".to_string()],
    ));

    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("attempts.jsonl");
    let config = Config {
        attempt_log_file: Some(log_path.clone()),
        ..test_config()
    };

    let report = flow(config, loader.clone(), llm)
        .run_chain(&job(&q1))
        .await;

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(report.stop, ChainStop::Completed);
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.correct(), 1);
    assert_eq!(loader.calls(), 2);

    let stats = AttemptLog::new(log_path).statistics().await.unwrap();
    assert_eq!(stats.total_attempts, 2);
    assert_eq!(stats.correct, 1);
}

#[tokio::test]
async fn test_chain_stops_at_max_length() {
    let mut server = mockito::Server::new_async().await;
    let q1 = format!("{}/loop", server.url());
    let submit_url = format!("{}/submit", server.url());

    // 每次都指回同一道题
    let submit = server
        .mock("POST", "/submit")
        .with_status(200)
        .with_body(json!({ "correct": false, "url": q1 }).to_string())
        .expect(2)
        .create_async()
        .await;

    let loader = shared(StubLoader::new().with_page(RenderedPage::from_text(&q1, "Loop")));
    let llm = shared(ScriptedLlm::new(
        vec![parse_reply(&submit_url, &[], "number"); 3],
        vec!["1".to_string(); 3],
    ));
    let config = Config {
        max_chain_length: 2,
        ..test_config()
    };

    let report = flow(config, loader, llm).run_chain(&job(&q1)).await;

    submit.assert_async().await;
    assert_eq!(report.stop, ChainStop::LimitReached);
    assert_eq!(report.results.len(), 2);
}

#[tokio::test]
async fn test_llm_failure_abandons_quiz_without_submitting() {
    let mut server = mockito::Server::new_async().await;
    let quiz_url = format!("{}/q-fail", server.url());

    let submit = server
        .mock("POST", "/submit")
        .expect(0)
        .create_async()
        .await;

    let loader = shared(StubLoader::new().with_page(RenderedPage::from_text(&quiz_url, "Q")));
    let llm = shared(ScriptedLlm::failing());

    let report = flow(test_config(), loader, llm)
        .run_chain(&job(&quiz_url))
        .await;

    submit.assert_async().await;
    assert!(report.results.is_empty());
    assert!(matches!(report.stop, ChainStop::Failed(_)));
}

#[tokio::test]
async fn test_missing_submit_url_abandons_quiz() {
    let quiz_url = "https://quiz.example/no-submit";
    let loader = shared(StubLoader::new().with_page(RenderedPage::from_text(
        quiz_url,
        "A page that never says where to post.",
    )));
    let llm = shared(ScriptedLlm::new(
        vec![r#"{"question": "Q", "submit_url": null}"#.to_string()],
        vec!["1".to_string()],
    ));

    let result = flow(test_config(), loader, llm)
        .solve_single(&job(quiz_url), quiz_url)
        .await;

    assert!(matches!(
        result,
        Err(AppError::Submit(quiz_solver::error::SubmitError::MissingSubmitUrl))
    ));
}

#[tokio::test]
async fn test_insufficient_time_skips_loading() {
    let quiz_url = "https://quiz.example/late";
    let loader = shared(StubLoader::new());
    let llm = shared(ScriptedLlm::new(vec![], vec![]));
    let flow = flow(test_config(), loader.clone(), llm);

    let short_job = Job::new(quiz_url, "a@b.com", "S", Duration::from_secs(3));

    let single = flow.solve_single(&short_job, quiz_url).await;
    assert!(matches!(single, Err(AppError::DeadlineExceeded { .. })));

    let report = flow.run_chain(&short_job).await;
    assert_eq!(report.stop, ChainStop::OutOfTime);
    assert_eq!(loader.calls(), 0);
}
