//! HTTP behaviour of `OpenAiGenerator` against a local mock endpoint.

use criteria_doc::ProblemStatement;
use criteria_regen::{GenerationError, Generator, OpenAiConfig, OpenAiGenerator, RegenerateRequest};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> RegenerateRequest {
    RegenerateRequest::new("SEPSIS-001", ProblemStatement::default())
}

fn completion_body() -> serde_json::Value {
    let content = json!({
        "problem_statement_json": { "problem_statement": "rewritten" },
        "edit_rationale": "addressed keyword issue",
    })
    .to_string();
    json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
}

fn generator(server: &MockServer, fallback: Option<&str>) -> OpenAiGenerator {
    let config = OpenAiConfig::new("sk-test")
        .with_base_url(&server.uri())
        .with_model("primary-model")
        .with_fallback_model(fallback);
    OpenAiGenerator::new(config).unwrap()
}

#[tokio::test]
async fn primary_model_success_sends_json_mode_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "primary-model",
            "response_format": { "type": "json_object" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let draft = generator(&server, Some("fallback-model"))
        .generate(&request())
        .await
        .unwrap();
    assert_eq!(draft.edit_rationale, "addressed keyword issue");
    assert_eq!(draft.problem_statement_json["problem_statement"], "rewritten");
}

#[tokio::test]
async fn model_not_found_falls_back_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "primary-model" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": "model_not_found", "message": "no such model" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "fallback-model" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let draft = generator(&server, Some("fallback-model"))
        .generate(&request())
        .await
        .unwrap();
    assert_eq!(draft.edit_rationale, "addressed keyword issue");
}

#[tokio::test]
async fn fallback_is_not_retried_when_it_is_also_missing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let err = generator(&server, Some("fallback-model"))
        .generate(&request())
        .await
        .unwrap_err();
    match err {
        GenerationError::ModelNotFound { model } => assert_eq!(model, "fallback-model"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn other_api_errors_do_not_fall_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "code": "server_error", "message": "upstream overloaded" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = generator(&server, Some("fallback-model"))
        .generate(&request())
        .await
        .unwrap_err();
    match err {
        GenerationError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn no_fallback_configured_surfaces_model_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = generator(&server, None)
        .generate(&request())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::ModelNotFound { .. }));
}
