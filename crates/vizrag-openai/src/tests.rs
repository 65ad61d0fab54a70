//! Snapshot and HTTP status tests for the OpenAI-compatible client

#[cfg(test)]
mod snapshot_tests {
    use crate::{EmbeddingProvider, LLMProvider, OpenAIClient, OpenAIConfig};
    use insta::assert_yaml_snapshot;

    #[test]
    fn test_config_snapshot_hides_key() {
        let config = OpenAIConfig::new("sk-test-secret");

        assert_yaml_snapshot!(config, @r###"
        api_base: "https://api.openai.com/v1"
        chat_model: gpt-4o-mini
        embedding_model: text-embedding-3-small
        timeout_secs: 60
        "###);
    }

    #[test]
    fn test_client_model_ids() {
        let mut config = OpenAIConfig::new("sk-test");
        config.chat_model = "gpt-4.1".to_string();
        config.embedding_model = "text-embedding-3-large".to_string();
        let client = OpenAIClient::new(config).unwrap();

        assert_eq!(LLMProvider::model_id(&client), "gpt-4.1");
        assert_eq!(EmbeddingProvider::model_id(&client), "text-embedding-3-large");
    }

    #[test]
    fn test_client_rejects_empty_key() {
        let result = OpenAIClient::new(OpenAIConfig::new(""));
        assert!(matches!(result, Err(crate::Error::MissingCredential(_))));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let mut config = OpenAIConfig::new("sk-test");
        config.api_base = "http://127.0.0.1:9".to_string();
        let client = OpenAIClient::new(config).unwrap();

        let vectors = client.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}

#[cfg(test)]
mod http_tests {
    use crate::{
        EmbeddingProvider, Error, GenerationConfig, LLMProvider, OpenAIClient, OpenAIConfig, Prompt,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response on a local port. The handle yields the
    /// raw request that was received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/v1", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });

        (base, handle)
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buffer);
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    fn client(api_base: String) -> OpenAIClient {
        let mut config = OpenAIConfig::new("sk-test");
        config.api_base = api_base;
        config.timeout_secs = 5;
        OpenAIClient::new(config).unwrap()
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "Answer from the context.".to_string(),
            user: "Context:\n[1] notes.txt\nTarjeta KPI\n\nQuestion: KPI?".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_embedding_is_an_embedding_service_error() {
        let (base, server) = serve_once(
            "401 Unauthorized",
            r#"{"error":{"message":"Incorrect API key provided"}}"#,
        )
        .await;

        let err = client(base).embed_batch(&["Tarjeta KPI"]).await.unwrap_err();
        match err {
            Error::EmbeddingService(detail) => {
                assert!(detail.contains("authentication failed"));
                assert!(detail.contains("Incorrect API key provided"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/embeddings "));
        assert!(request.contains("Bearer sk-test"));
    }

    #[tokio::test]
    async fn test_rate_limited_chat_is_a_generation_service_error() {
        let (base, server) = serve_once(
            "429 Too Many Requests",
            r#"{"error":{"message":"You exceeded your current quota"}}"#,
        )
        .await;

        let config = GenerationConfig {
            model_id: "gpt-4o".to_string(),
            max_tokens: 128,
            temperature: Some(0.0),
        };
        let err = client(base)
            .generate_with_config(&prompt(), &config)
            .await
            .unwrap_err();
        match err {
            Error::GenerationService(detail) => {
                assert!(detail.contains("rate limit"));
                assert!(detail.contains("current quota"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions "));
        assert!(request.contains(r#""model":"gpt-4o""#));
        assert!(request.contains(r#""max_tokens":128"#));
    }

    #[tokio::test]
    async fn test_server_error_without_json_body() {
        let (base, server) = serve_once("503 Service Unavailable", "upstream down").await;

        let err = client(base).embed_batch(&["Semáforo"]).await.unwrap_err();
        match err {
            Error::EmbeddingService(detail) => {
                assert!(detail.contains("503"));
                assert!(detail.contains("upstream down"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_embeddings_are_returned_in_input_order() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .await;

        let vectors = client(base).embed_batch(&["first", "second"]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        server.await.unwrap();
    }
}
