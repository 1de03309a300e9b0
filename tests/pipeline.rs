//! End-to-end pipeline scenarios over the sample API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};

use endpoint_engine::config::StatusConfig;
use endpoint_engine::pipeline::{Outcome, PipelineRequest};

mod common;
use common::Recorder;

#[derive(Debug, Clone)]
struct Session {
    user: Option<&'static str>,
}

fn anonymous() -> Session {
    Session { user: None }
}

fn signed_in() -> Session {
    Session { user: Some("ann") }
}

fn setup() -> (endpoint_engine::Pipeline<Session>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let pipeline = common::sample_pipeline(|s: &Session| s.user.is_some(), recorder.clone());
    (pipeline, recorder)
}

fn json_request(
    context: Session,
    method: Method,
    path: &str,
    read: Arc<AtomicBool>,
    content_type: &str,
    body: &'static [u8],
) -> PipelineRequest<Session> {
    PipelineRequest {
        content_type: Some(content_type.to_string()),
        body: common::tracked_body(read, body),
        ..common::request(context, method, path, "")
    }
}

#[tokio::test]
async fn test_list_things_returns_empty_json_array() {
    let (pipeline, recorder) = setup();
    let outcome = pipeline
        .process(common::request(anonymous(), Method::GET, "/api/thing", ""))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.status(&StatusConfig::default()), StatusCode::OK);
    match outcome {
        Outcome::Success(output) => {
            assert_eq!(output.content_type, "application/json");
            assert_eq!(output.body.as_deref(), Some(&b"[]"[..]));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(recorder.events(), vec!["handler_start", "handler_end"]);
}

#[tokio::test]
async fn test_unregistered_method_lists_allowed_in_order() {
    let (pipeline, recorder) = setup();
    let outcome = pipeline
        .process(common::request(anonymous(), Method::PUT, "/api/thing", ""))
        .await;

    match outcome {
        Outcome::InvalidMethod { allowed } => assert_eq!(allowed, vec![Method::POST, Method::GET]),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(recorder.events(), vec!["invalid_method"]);
}

#[tokio::test]
async fn test_declared_pattern_mismatch_is_invalid_url() {
    let (pipeline, recorder) = setup();
    let outcome = pipeline
        .process(common::request(anonymous(), Method::GET, "/api/thing/abc", ""))
        .await;

    assert!(matches!(outcome, Outcome::InvalidUrl));
    assert_eq!(outcome.status(&StatusConfig::default()), StatusCode::NOT_FOUND);
    assert_eq!(recorder.events(), vec!["invalid_url"]);
}

#[tokio::test]
async fn test_validator_rejection_reports_every_parameter() {
    let (pipeline, recorder) = setup();
    let outcome = pipeline
        .process(common::request(anonymous(), Method::GET, "/api/item/zero/0", ""))
        .await;

    match &outcome {
        Outcome::InvalidUrlParameters(errors) => {
            let names: Vec<&str> = errors.iter().map(|e| e.name.as_str()).collect();
            assert_eq!(names, vec!["slug", "n"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        recorder.events(),
        vec!["invalid_url_parameter:slug", "invalid_url_parameter:n"]
    );

    let strict = StatusConfig {
        invalid_url_parameters: 422,
        ..StatusConfig::default()
    };
    assert_eq!(outcome.status(&strict), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_url_parameters_reach_handler() {
    let (pipeline, _) = setup();
    let outcome = pipeline
        .process(common::request(anonymous(), Method::GET, "/api/item/2/3", ""))
        .await;
    match outcome {
        Outcome::Success(output) => assert_eq!(output.body.as_deref(), Some(&b"5"[..])),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_credentials_reject_without_event_or_body_read() {
    let (pipeline, recorder) = setup();
    let read = Arc::new(AtomicBool::new(false));
    let outcome = pipeline
        .process(json_request(
            anonymous(),
            Method::POST,
            "/api/secret",
            read.clone(),
            "text/plain",
            b"not even json",
        ))
        .await;

    match outcome {
        Outcome::ContextRejected { status, .. } => assert_eq!(status, Some(StatusCode::FORBIDDEN)),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(recorder.events().is_empty());
    assert!(!read.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_invalid_context_stops_before_body() {
    let (pipeline, recorder) = setup();
    let read = Arc::new(AtomicBool::new(false));
    let outcome = pipeline
        .process(json_request(
            anonymous(),
            Method::POST,
            "/api/profile",
            read.clone(),
            "text/plain",
            b"not even json",
        ))
        .await;

    assert!(matches!(outcome, Outcome::InvalidContext(_)));
    assert_eq!(
        outcome.status(&StatusConfig::default()),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(recorder.events(), vec!["invalid_context"]);
    assert!(!read.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_valid_context_reaches_handler() {
    let (pipeline, recorder) = setup();
    let read = Arc::new(AtomicBool::new(false));
    let outcome = pipeline
        .process(json_request(
            signed_in(),
            Method::POST,
            "/api/profile",
            read.clone(),
            "application/json",
            br#"{"name":"ann"}"#,
        ))
        .await;

    assert!(outcome.is_success());
    assert!(read.load(Ordering::SeqCst));
    assert_eq!(recorder.events(), vec!["handler_start", "handler_end"]);
}

#[tokio::test]
async fn test_abandoned_body_read_releases_stream() {
    let (pipeline, recorder) = setup();
    let dropped = Arc::new(AtomicBool::new(false));
    let request = PipelineRequest {
        content_type: Some("application/json".to_string()),
        body: common::stalled_body(dropped.clone()),
        ..common::request(anonymous(), Method::POST, "/api/thing", "")
    };

    let result = tokio::time::timeout(Duration::from_millis(50), pipeline.process(request)).await;

    assert!(result.is_err());
    assert!(dropped.load(Ordering::SeqCst));
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_authorized_request_reads_body() {
    let (pipeline, recorder) = setup();
    let read = Arc::new(AtomicBool::new(false));
    let outcome = pipeline
        .process(json_request(
            signed_in(),
            Method::POST,
            "/api/secret",
            read.clone(),
            "application/json",
            br#"{"name":"key"}"#,
        ))
        .await;

    match outcome {
        Outcome::Success(output) => assert_eq!(output.body.as_deref(), Some(&br#""admin stored key""#[..])),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(read.load(Ordering::SeqCst));
    assert_eq!(recorder.events(), vec!["handler_start", "handler_end"]);
}

#[tokio::test]
async fn test_content_type_and_body_failures_are_distinct() {
    let (pipeline, recorder) = setup();

    let read = Arc::new(AtomicBool::new(false));
    let outcome = pipeline
        .process(json_request(anonymous(), Method::POST, "/api/thing", read, "text/plain", b"x"))
        .await;
    assert!(matches!(outcome, Outcome::UnsupportedContentType(ref ct) if ct == "text/plain"));
    assert_eq!(outcome.status(&StatusConfig::default()), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let read = Arc::new(AtomicBool::new(false));
    let outcome = pipeline
        .process(json_request(anonymous(), Method::POST, "/api/thing", read, "application/json", b"{}"))
        .await;
    assert!(matches!(outcome, Outcome::InvalidBody(_)));
    assert_eq!(outcome.status(&StatusConfig::default()), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(
        recorder.events(),
        vec!["invalid_content_type:text/plain", "invalid_body"]
    );
}

#[tokio::test]
async fn test_query_rejected_without_validator() {
    let (pipeline, recorder) = setup();
    let outcome = pipeline
        .process(common::request(anonymous(), Method::GET, "/api/thing", "page=2"))
        .await;
    assert!(matches!(outcome, Outcome::InvalidQuery(_)));
    assert_eq!(recorder.events(), vec!["invalid_query"]);
}

#[tokio::test]
async fn test_output_failure_is_a_fault() {
    let (pipeline, recorder) = setup();
    let outcome = pipeline
        .process(common::request(anonymous(), Method::GET, "/api/broken", ""))
        .await;
    assert!(matches!(outcome, Outcome::InvalidOutput(_)));
    assert!(!outcome.is_success());
    assert_eq!(
        outcome.status(&StatusConfig::default()),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        recorder.events(),
        vec!["handler_start", "handler_end", "invalid_response"]
    );
}

#[tokio::test]
async fn test_no_content_output() {
    let (pipeline, _) = setup();
    let outcome = pipeline
        .process(common::request(anonymous(), Method::DELETE, "/api/thing/7", ""))
        .await;
    assert_eq!(outcome.status(&StatusConfig::default()), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_pipeline_is_shared_across_tasks() {
    let (pipeline, recorder) = setup();
    let mut tasks = Vec::new();
    for id in 0..16u64 {
        let pipeline = pipeline.clone();
        tasks.push(tokio::spawn(async move {
            let path = format!("/api/thing/{id}");
            pipeline
                .process(common::request(anonymous(), Method::GET, &path, ""))
                .await
        }));
    }
    for (id, task) in tasks.into_iter().enumerate() {
        match task.await.unwrap() {
            Outcome::Success(output) => {
                assert_eq!(output.body.as_deref(), Some(id.to_string().as_bytes()));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(recorder.events().len(), 32);
}
