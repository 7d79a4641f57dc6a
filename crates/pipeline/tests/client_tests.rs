//! Tests for the HTTP augmentation client against a mock chat-completions
//! endpoint.

use httpmock::prelude::*;
use serde_json::json;

use relaycast_config::AugmentationConfig;
use relaycast_pipeline::{AugmentationClient, CompletionRequest, HttpAugmentationClient};

fn config_for(server: &MockServer) -> AugmentationConfig {
    AugmentationConfig {
        api_key: Some("test-key".to_string()),
        base_url: server.base_url(),
        deployment: Some("test-model".to_string()),
        ..AugmentationConfig::default()
    }
}

fn request() -> CompletionRequest {
    CompletionRequest {
        prompt: "@gpt say hello".to_string(),
        max_tokens: 200,
    }
}

#[tokio::test]
async fn successful_completion_returns_the_first_choice() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .header("authorization", "Bearer test-key")
            .json_body_partial(
                json!({
                    "model": "test-model",
                    "max_tokens": 200,
                    "messages": [{"role": "user", "content": "@gpt say hello"}]
                })
                .to_string(),
            );
        then.status(200).json_body(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "hello back"}}
            ]
        }));
    });

    let client = HttpAugmentationClient::from_config(&config_for(&server)).expect("client");
    let content = client.complete(request()).await.expect("complete");

    mock.assert();
    assert_eq!(content.as_deref(), Some("hello back"));
}

#[tokio::test]
async fn empty_choice_list_yields_no_content() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(json!({"choices": []}));
    });

    let client = HttpAugmentationClient::from_config(&config_for(&server)).expect("client");
    let content = client.complete(request()).await.expect("complete");

    assert_eq!(content, None);
}

#[tokio::test]
async fn null_or_empty_content_yields_no_content() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(json!({
            "choices": [{"message": {"role": "assistant", "content": ""}}]
        }));
    });

    let client = HttpAugmentationClient::from_config(&config_for(&server)).expect("client");
    let content = client.complete(request()).await.expect("complete");

    assert_eq!(content, None);
}

#[tokio::test]
async fn server_failure_maps_to_a_transient_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(500);
    });

    let client = HttpAugmentationClient::from_config(&config_for(&server)).expect("client");
    let error = client.complete(request()).await.expect_err("must fail");

    assert!(!error.is_configuration());
    assert!(!error.is_deadline());
}

#[tokio::test]
async fn missing_deployment_is_a_configuration_error_with_no_request() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200);
    });

    let mut config = config_for(&server);
    config.deployment = None;

    let client = HttpAugmentationClient::from_config(&config).expect("client");
    let error = client.complete(request()).await.expect_err("must fail");

    assert!(error.is_configuration());
    mock.assert_hits(0);
}

#[tokio::test]
async fn missing_api_key_is_a_configuration_error_with_no_request() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200);
    });

    let mut config = config_for(&server);
    config.api_key = None;

    let client = HttpAugmentationClient::from_config(&config).expect("client");
    let error = client.complete(request()).await.expect_err("must fail");

    assert!(error.is_configuration());
    mock.assert_hits(0);
}

#[tokio::test]
async fn slow_backend_is_reported_as_a_deadline_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200)
            .delay(std::time::Duration::from_millis(1_500))
            .json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "too late"}}]
            }));
    });

    let mut config = config_for(&server);
    config.request_timeout_seconds = 1;

    let client = HttpAugmentationClient::from_config(&config).expect("client");
    let error = client.complete(request()).await.expect_err("must time out");

    assert!(error.is_deadline());
}
