//! End-to-end synthesis against a mocked Inworld endpoint

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use std::sync::Arc;
use voiceover_core::{
    chunk_text, ChunkBounds, InworldClient, ProviderConfig, SynthesisOptions,
    SynthesisOrchestrator, VoiceoverError,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Answers every request with its own text as the "audio".
struct EchoResponder;

impl Respond for EchoResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let text = body["text"].as_str().unwrap();
        ResponseTemplate::new(200).set_body_json(json!({ "audioContent": STANDARD.encode(text) }))
    }
}

fn provider_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        base_url: server.uri(),
        api_key: "key".to_string(),
        api_secret: "secret".to_string(),
        retry_backoff_ms: 10,
        ..ProviderConfig::default()
    }
}

fn orchestrator(config: ProviderConfig) -> SynthesisOrchestrator {
    let client = InworldClient::new(&config).unwrap();
    SynthesisOrchestrator::new(Arc::new(client), config, ChunkBounds::default()).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_single_chunk_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/voice"))
        .and(header("Authorization", "Basic a2V5OnNlY3JldA=="))
        .and(header("Content-Type", "application/json"))
        .respond_with(EchoResponder)
        .expect(1)
        .mount(&server)
        .await;

    let payload = orchestrator(provider_config(&server))
        .synthesize("  Welcome to the show.  ", "Dennis", SynthesisOptions::default())
        .await
        .unwrap();
    assert_eq!(payload.bytes, b"Welcome to the show.");
    assert_eq!(payload.chunk_count, 1);

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body,
        json!({
            "text": "Welcome to the show.",
            "voiceId": "Dennis",
            "modelId": "inworld-tts-1",
            "speakingRate": 1.0,
            "pitch": 1.0,
            "audioEncoding": "MP3"
        })
    );
}

#[test_log::test(tokio::test)]
async fn test_long_script_is_synthesized_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/voice"))
        .respond_with(EchoResponder)
        .expect(2)
        .mount(&server)
        .await;

    let text = format!("{}. {}", "x".repeat(1199), "y".repeat(1299));
    let chunks = chunk_text(&text);
    assert_eq!(chunks.len(), 2);

    let payload = orchestrator(provider_config(&server))
        .synthesize(&text, "Alex", SynthesisOptions::default())
        .await
        .unwrap();

    let expected: String = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(payload.bytes, expected.as_bytes());
    assert_eq!(payload.chunk_count, 2);

    let sent: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["text"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(sent, vec![chunks[0].text.clone(), chunks[1].text.clone()]);
}

#[test_log::test(tokio::test)]
async fn test_rate_limited_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/voice"))
        .respond_with(ResponseTemplate::new(500).set_body_string("rate limited"))
        .expect(1)
        .mount(&server)
        .await;

    let err = orchestrator(provider_config(&server))
        .synthesize("Hello there.", "Alex", SynthesisOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, VoiceoverError::ProviderError { status: 500, .. }));
    assert!(err.to_string().contains("rate limited"));
}

#[test_log::test(tokio::test)]
async fn test_second_chunk_failure_returns_no_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(EchoResponder)
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad voice"))
        .mount(&server)
        .await;

    let text = format!("{}. {}", "x".repeat(1199), "y".repeat(1299));
    let err = orchestrator(provider_config(&server))
        .synthesize(&text, "Alex", SynthesisOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, VoiceoverError::provider(400, "bad voice"));
}

#[test_log::test(tokio::test)]
async fn test_timeouts_are_retried_then_surface() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_secs(3))
                .set_body_json(json!({ "audioContent": "SUQz" })),
        )
        .expect(3)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        request_timeout_secs: 1,
        ..provider_config(&server)
    };
    let err = orchestrator(config)
        .synthesize("Hello there.", "Alex", SynthesisOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_retriable(), "{err:?}");
}

#[test_log::test(tokio::test)]
async fn test_unencodable_credential_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(EchoResponder)
        .expect(0)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        api_secret: "s€cret".to_string(),
        ..provider_config(&server)
    };
    let err = orchestrator(config)
        .synthesize("Hello", "Alex", SynthesisOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VoiceoverError::EncodingError { .. }));
}
