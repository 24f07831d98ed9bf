//! Integration test: retrieval context → prompt → completion → citation report,
//! against a local one-shot HTTP server.

use ragbench_core::{ChunkingConfig, LlmConfig, LlmMode, PromptConfig, RagError};
use ragbench_prompt::citations::check_citations;
use ragbench_prompt::llm::LlmClient;
use ragbench_prompt::prompt::build_messages;
use ragbench_retrieval::chunker::chunk_text;
use ragbench_retrieval::context::build_context;
use ragbench_retrieval::keyword::KeywordIndex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve one canned HTTP response and hand back the raw request body.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/v1/chat/completions", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let length = text[..split]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= split + 4 + length || n == 0 {
                    break;
                }
            } else if n == 0 {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let text = String::from_utf8_lossy(&raw).to_string();
        text.split_once("\r\n\r\n")
            .map(|(_, b)| b.to_string())
            .unwrap_or_default()
    });

    (url, handle)
}

fn api_config(endpoint: String) -> LlmConfig {
    LlmConfig {
        mode: LlmMode::Api,
        endpoint: Some(endpoint),
        model: Some("test-model".into()),
        api_key: Some("sk-local".into()),
        ..LlmConfig::default()
    }
}

#[tokio::test]
async fn answer_with_citations_round_trip() {
    let chunks = chunk_text(
        "tokio schedules tasks on worker threads serde derives serializers for structs",
        &ChunkingConfig::new(6, 0).unwrap(),
    )
    .unwrap();
    let index = KeywordIndex::build(&chunks);
    let results = index.search("tokio tasks", 1).unwrap();
    let context = build_context(&results, 9000);
    let messages = build_messages("How does tokio run tasks?", &context, &PromptConfig::default());

    let (url, server) = serve_once(
        "200 OK",
        r#"{"choices":[{"message":{"role":"assistant","content":" Worker threads [chunk:0], also [chunk:5]. "}}]}"#,
    )
    .await;
    let client = LlmClient::new(&api_config(url)).unwrap();
    let answer = client.complete(&messages).await.unwrap();
    assert_eq!(answer, "Worker threads [chunk:0], also [chunk:5].");

    let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(sent["model"], "test-model");
    assert_eq!(sent["max_tokens"], 512);
    assert_eq!(sent["messages"][0]["role"], "system");
    assert!(sent["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("[chunk:0 score:"));

    let report = check_citations(&answer, &results);
    assert_eq!(report.valid, vec![0]);
    assert_eq!(report.invalid, vec![5]);
}

#[tokio::test]
async fn error_status_is_reported_with_truncated_body() {
    let (url, server) = serve_once("503 Service Unavailable", "overloaded").await;
    let client = LlmClient::new(&api_config(url)).unwrap();

    let err = client
        .complete(&build_messages("q", "", &PromptConfig::default()))
        .await
        .unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, RagError::Llm(_)));
    assert!(err.to_string().contains("LLM call failed: 503 overloaded"));
}

#[tokio::test]
async fn connection_test_sends_fixed_small_request() {
    let (url, server) = serve_once("200 OK", r#"{"choices":[{"message":{"content":"OK"}}]}"#).await;
    let client = LlmClient::new(&api_config(url)).unwrap();

    assert_eq!(client.test_connection().await.unwrap(), "OK");

    let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(sent["max_tokens"], 16);
    assert_eq!(sent["temperature"], 0);
    assert_eq!(sent["messages"][0]["content"], "Reply with: OK");
}
