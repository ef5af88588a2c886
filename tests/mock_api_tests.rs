//! Mock API tests for the OpenAI-compatible translator
//!
//! A local wiremock server stands in for the chat completions endpoint.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use subtrans::error::SubtransError;
use subtrans::subtitle::{group_by_speaker, parse_srt};
use subtrans::translate::orchestrator::lines_in_order;
use subtrans::translate::{GroupTranslator, OpenAiTranslator, RetryPolicy, Translator};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn translator_for(server: &MockServer) -> OpenAiTranslator {
    OpenAiTranslator::new("sk-test".to_string())
        .with_base_url(server.uri())
        .with_model("test-model")
}

// ============================================================================
// Request / Response Tests
// ============================================================================

mod request_tests {
    use super::*;

    #[tokio::test]
    async fn test_sends_system_and_user_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "messages": [
                    { "role": "system", "content": "Translate to French." },
                    { "role": "user", "content": "Hello there." }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Bonjour.  ")))
            .expect(1)
            .mount(&server)
            .await;

        let result = translator_for(&server)
            .translate("Hello there.", "Translate to French.", 0.7)
            .await
            .unwrap();

        // trimming is the caller's job
        assert_eq!(result, "  Bonjour.  ");
    }

    #[tokio::test]
    async fn test_http_error_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(1)
            .mount(&server)
            .await;

        let result = translator_for(&server).translate("Hi", "prompt", 0.7).await;

        match result {
            Err(SubtransError::Api(message)) => {
                assert!(message.contains("500"));
                assert!(message.contains("upstream exploded"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_payload_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "error": { "message": "model not found" } })),
            )
            .mount(&server)
            .await;

        let result = translator_for(&server).translate("Hi", "prompt", 0.7).await;
        assert!(matches!(result, Err(SubtransError::Api(m)) if m == "model not found"));
    }

    #[tokio::test]
    async fn test_missing_choices_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let result = translator_for(&server).translate("Hi", "prompt", 0.7).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = translator_for(&server).translate("Hi", "prompt", 0.7).await;
        assert!(matches!(result, Err(SubtransError::Api(_))));
    }
}

// ============================================================================
// Group Translator Against Mock Server
// ============================================================================

mod group_tests {
    use super::*;

    const CONVERSATION: &str = "1
00:00:01,000 --> 00:00:02,000
ORION: Hello.

2
00:00:02,000 --> 00:00:03,000
MATT: Welcome back.
";

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            timeout: Duration::from_millis(200),
            timeout_delay: Duration::ZERO,
            error_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_groups_translated_through_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("译文")))
            .expect(2)
            .mount(&server)
            .await;

        let subtitles = parse_srt(CONVERSATION);
        let groups = group_by_speaker(&subtitles);
        let translator = GroupTranslator::new(Arc::new(translator_for(&server)), 2)
            .with_retry(fast_retry(1));

        let units = translator.translate_groups(&groups, "summary").await.unwrap();
        assert_eq!(lines_in_order(units), vec!["译文", "译文"]);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let subtitles = parse_srt("1\n00:00:01,000 --> 00:00:02,000\nORION: Hello.\n");
        let groups = group_by_speaker(&subtitles);
        let translator = GroupTranslator::new(Arc::new(translator_for(&server)), 1)
            .with_retry(fast_retry(3));

        let units = translator.translate_groups(&groups, "summary").await.unwrap();
        let lines = lines_in_order(units);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[translation error: API error: Completion API error (503"));
        assert!(lines[0].ends_with("ORION: Hello."));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("too late"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let subtitles = parse_srt("1\n00:00:01,000 --> 00:00:02,000\nORION: Hello.\n");
        let groups = group_by_speaker(&subtitles);
        let translator = GroupTranslator::new(Arc::new(translator_for(&server)), 1)
            .with_retry(fast_retry(1));

        let units = translator.translate_groups(&groups, "summary").await.unwrap();
        assert_eq!(
            lines_in_order(units),
            vec!["[translation timed out] ORION: Hello."]
        );
    }
}
