//! Ollama adapters against a mocked server.

#![cfg(feature = "ollama")]

use docqa_rag::{
    EmbeddingProvider, Generator, ModelConfig, OllamaEmbedder, OllamaGenerator, RagError,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ModelConfig {
    ModelConfig { retry_backoff_ms: 1, ..ModelConfig::default() }
        .with_base_url(server.uri())
        .with_max_retries(0)
}

#[tokio::test]
async fn embedder_probes_dimensions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .and(body_partial_json(json!({ "model": "all-minilm" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": [0.1, 0.2, 0.3] })))
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::connect(&config_for(&server)).await.unwrap();
    assert_eq!(embedder.dimensions(), 3);
    assert_eq!(embedder.model_name(), "all-minilm");
    assert_eq!(embedder.embed("pods").await.unwrap(), vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn embedder_rejects_wrong_length() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": [0.1, 0.2] })))
        .mount(&server)
        .await;

    let config = config_for(&server).with_embed_dimensions(4);
    let embedder = OllamaEmbedder::connect(&config).await.unwrap();
    let err = embedder.embed("pods").await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 4, actual: 2 }));
}

#[tokio::test]
async fn embedder_server_error_is_embedding_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let err = OllamaEmbedder::connect(&config_for(&server)).await.err().unwrap();
    assert!(
        matches!(err, RagError::EmbeddingFailure { ref message, .. } if message.contains("model not loaded"))
    );
}

#[tokio::test]
async fn request_is_retried_after_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": [1.0, 0.0] })))
        .mount(&server)
        .await;

    let config = config_for(&server).with_max_retries(1);
    let embedder = OllamaEmbedder::connect(&config).await.unwrap();
    assert_eq!(embedder.dimensions(), 2);
}

#[tokio::test]
async fn generator_sends_prompt_and_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "stream": false,
            "options": { "num_predict": 256 }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "Pods wrap containers.", "done": true })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let generator = OllamaGenerator::new(&config_for(&server)).unwrap();
    let answer = generator.generate("What do pods wrap?", "Pods wrap containers.").await.unwrap();
    assert_eq!(answer, "Pods wrap containers.");
}

#[tokio::test]
async fn blank_generation_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "   " })))
        .mount(&server)
        .await;

    let generator = OllamaGenerator::new(&config_for(&server)).unwrap();
    let err = generator.generate("q", "c").await.unwrap_err();
    assert!(matches!(err, RagError::GenerationFailure { .. }));
}

#[tokio::test]
async fn malformed_generation_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let generator = OllamaGenerator::new(&config_for(&server)).unwrap();
    let err = generator.generate("q", "c").await.unwrap_err();
    assert!(matches!(err, RagError::GenerationFailure { .. }));
}

#[tokio::test]
async fn health_check_reports_reachability() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    let generator = OllamaGenerator::new(&config_for(&server)).unwrap();
    assert!(generator.health_check().await);

    let offline = OllamaGenerator::new(&ModelConfig::default().with_base_url("http://127.0.0.1:9")).unwrap();
    assert!(!offline.health_check().await);
}
