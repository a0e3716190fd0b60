#![cfg(feature = "commentary")]

use statement_analyzer::llm::CommentaryClient;
use statement_analyzer::{AnalysisError, CommentaryRequest};

#[tokio::test]
async fn test_unreachable_endpoint_surfaces_commentary_error() {
    // Closed local port: the request fails fast without leaving the host.
    let client =
        CommentaryClient::new("test-key".to_string()).with_base_url("http://127.0.0.1:9");
    let request = CommentaryRequest {
        system: "system".to_string(),
        user: "user".to_string(),
    };

    let err = client.generate(&request).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Commentary(_)));
}
