use providers::ollama::{OllamaConfig, OllamaProvider};
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::qdrant::{QdrantClient, QdrantConfig};
use providers::{EmbeddingProvider, GenerateParams, LlmProvider, ProviderError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ollama(server: &MockServer, timeout: Duration) -> OllamaProvider {
    OllamaProvider::new(OllamaConfig {
        base_url: server.uri(),
        embedding_model: "mxbai-embed-large".into(),
        chat_model: "deepseek-r1:7b".into(),
        request_timeout: timeout,
    })
}

fn qdrant(server: &MockServer, timeout: Duration) -> QdrantClient {
    QdrantClient::new(QdrantConfig {
        url: server.uri(),
        collection: "knowledge".into(),
        api_key: None,
        request_timeout: timeout,
    })
}

#[tokio::test]
async fn ollama_generate_sends_temperature_and_returns_response_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "deepseek-r1:7b",
            "stream": false,
            "options": { "temperature": 0.2 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "deepseek-r1:7b",
            "response": "{\"category\":\"Billing\"}",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = ollama(&server, Duration::from_secs(5))
        .generate("classify me", &GenerateParams { temperature: 0.2 })
        .await
        .unwrap();
    assert_eq!(out, "{\"category\":\"Billing\"}");
}

#[tokio::test]
async fn ollama_embed_returns_one_vector_per_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "mxbai-embed-large",
            "embeddings": [[0.1, 0.2], [0.3, 0.4]]
        })))
        .mount(&server)
        .await;

    let resp = ollama(&server, Duration::from_secs(5))
        .embed(&["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(resp.vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
}

#[tokio::test]
async fn non_success_status_is_reported_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let err = ollama(&server, Duration::from_secs(5))
        .generate("x", &GenerateParams::default())
        .await
        .unwrap_err();
    match err {
        ProviderError::RequestFailed(msg) => {
            assert!(msg.contains("500"), "{msg}");
            assert!(msg.contains("model not loaded"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_backend_hits_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "late" }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let err = ollama(&server, Duration::from_millis(50))
        .generate("x", &GenerateParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::RequestFailed(_)));
}

#[tokio::test]
async fn slow_qdrant_search_hits_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/knowledge/points/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": [] }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let err = qdrant(&server, Duration::from_millis(50))
        .search(vec![0.1, 0.2], 3)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::RequestFailed(_)));
}

#[tokio::test]
async fn openai_chat_returns_first_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "temperature": 0.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "hello" } }]
        })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(OpenAiConfig {
        api_key: "sk-test".into(),
        base_url: server.uri(),
        embedding_model: "text-embedding-3-small".into(),
        chat_model: "gpt-4o-mini".into(),
        request_timeout: Duration::from_secs(5),
    });
    let out = provider
        .generate("hi", &GenerateParams { temperature: 0.0 })
        .await
        .unwrap();
    assert_eq!(out, "hello");
}

#[tokio::test]
async fn openai_empty_choices_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(OpenAiConfig {
        api_key: "sk-test".into(),
        base_url: server.uri(),
        embedding_model: "e".into(),
        chat_model: "c".into(),
        request_timeout: Duration::from_secs(5),
    });
    let err = provider
        .generate("hi", &GenerateParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn qdrant_search_returns_scored_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/knowledge/points/search"))
        .and(body_partial_json(json!({ "limit": 3, "with_payload": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "result": [
                { "id": 0, "score": 0.91, "payload": { "category": "Billing" } }
            ]
        })))
        .mount(&server)
        .await;

    let resp = qdrant(&server, Duration::from_secs(5))
        .search(vec![0.1, 0.2], 3)
        .await
        .unwrap();
    assert_eq!(resp.result.len(), 1);
    assert_eq!(resp.result[0].score, 0.91);
    assert_eq!(
        resp.result[0].payload.as_ref().unwrap()["category"],
        json!("Billing")
    );
}
