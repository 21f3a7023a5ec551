use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use nexus_match::MatchError;
use nexus_match::search::{ApiEmbedder, EmbeddingProvider};

fn embedder(server: &MockServer, dims: usize) -> ApiEmbedder {
    ApiEmbedder::new(
        &server.base_url(),
        "text-embedding-3-small",
        Some("test-key".to_string()),
        dims,
        Some(Duration::from_secs(5)),
    )
    .unwrap()
}

#[test]
fn posts_model_and_input_with_bearer_auth() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/embeddings")
            .header("authorization", "Bearer test-key")
            .json_body(json!({
                "model": "text-embedding-3-small",
                "input": "ESL teacher in Seoul",
            }));
        then.status(200).json_body(json!({
            "data": [{ "embedding": [0.1, 0.2, 0.3] }],
        }));
    });

    let vector = embedder(&server, 3).embed("ESL teacher in Seoul").unwrap();

    mock.assert();
    assert_eq!(vector.as_slice(), &[0.1f32, 0.2, 0.3]);
}

#[test]
fn server_error_is_a_provider_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(500).body("upstream down");
    });

    let err = embedder(&server, 3).embed("text").unwrap_err();
    assert!(matches!(err, MatchError::EmbeddingProvider(_)));
    assert_eq!(err.user_message(), nexus_match::error::MATCHING_UNAVAILABLE);
    assert!(err.is_retryable());
}

#[test]
fn wrong_dimension_count_is_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({
            "data": [{ "embedding": [0.1, 0.2] }],
        }));
    });

    let err = embedder(&server, 3).embed("text").unwrap_err();
    assert!(matches!(err, MatchError::EmbeddingProvider(_)));
}

#[test]
fn empty_data_is_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({ "data": [] }));
    });

    assert!(matches!(
        embedder(&server, 3).embed("text"),
        Err(MatchError::EmbeddingProvider(_))
    ));
}
