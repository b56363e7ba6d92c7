use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::method;
use wiremock::matchers::path;
use writeup_client::ActiveSession;
use writeup_client::ClientError;
use writeup_client::WriteupClient;
use writeup_protocol::PlaceholderMap;
use writeup_protocol::wire::ExportFormat;
use writeup_protocol::wire::GenerateRequest;

fn client_for(server: &MockServer) -> WriteupClient {
    WriteupClient::new(&server.uri(), "writeup/test").expect("client")
}

fn flag_request() -> GenerateRequest {
    GenerateRequest {
        prompt: "Found the flag at [[img1]]".to_string(),
        mappings: PlaceholderMap::from([(
            "[[img1]]".to_string(),
            "data:image/png;base64,AAA".to_string(),
        )]),
        category: "web".to_string(),
    }
}

#[tokio::test]
async fn generate_sends_exact_body_and_returns_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_json(json!({
            "prompt": "Found the flag at [[img1]]",
            "mappings": {"[[img1]]": "data:image/png;base64,AAA"},
            "category": "web",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": "s1",
            "generated_text": "## Solution\n...",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .generate(&flag_request())
        .await
        .expect("generate");

    assert_eq!(response.session_id.as_deref(), Some("s1"));
    assert_eq!(response.generated_text, "## Solution\n...");
}

#[tokio::test]
async fn generate_surfaces_server_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "rate limited"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate(&flag_request())
        .await
        .expect_err("404 must fail");

    assert!(matches!(err, ClientError::Server { .. }), "got {err:?}");
    assert_eq!(err.user_message(), "Error: rate limited");
}

#[tokio::test]
async fn generate_with_empty_error_body_uses_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate(&flag_request())
        .await
        .expect_err("500 must fail");

    assert_eq!(err.user_message(), "Error: request failed with status 500");
}

#[tokio::test]
async fn export_without_session_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    for format in [ExportFormat::Package, ExportFormat::Docx] {
        let err = client
            .export_session(format, None)
            .await
            .expect_err("no session");
        assert!(matches!(err, ClientError::NoActiveSession));
    }

    assert!(
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty()
    );
}

#[tokio::test]
async fn export_posts_session_and_returns_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download-docx"))
        .and(body_json(json!({
            "session_id": "s1",
            "markdown_content": "## Solution",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04docx".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let session = ActiveSession {
        session_id: "s1".to_string(),
        markdown: "## Solution".to_string(),
    };
    let bytes = client_for(&server)
        .export_session(ExportFormat::Docx, Some(&session))
        .await
        .expect("export");

    assert_eq!(bytes, b"PK\x03\x04docx".to_vec());
}

#[tokio::test]
async fn export_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download-package"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Session not found"})))
        .mount(&server)
        .await;

    let session = ActiveSession {
        session_id: "expired".to_string(),
        markdown: "text".to_string(),
    };
    let err = client_for(&server)
        .export_session(ExportFormat::Package, Some(&session))
        .await
        .expect_err("export must fail");

    assert_eq!(err.user_message(), "Error: Session not found");
}

#[tokio::test]
async fn ping_unwraps_json_string_banner() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!("CTF Writeup Generator API is running.")),
        )
        .mount(&server)
        .await;

    let banner = client_for(&server).ping().await.expect("ping");
    assert_eq!(banner, "CTF Writeup Generator API is running.");
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    // Bind and immediately release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let client =
        WriteupClient::new(&format!("http://127.0.0.1:{port}"), "writeup/test").expect("client");
    let err = client
        .generate(&flag_request())
        .await
        .expect_err("server is gone");

    assert!(matches!(err, ClientError::Transport(_)), "got {err:?}");
    assert_eq!(
        err.user_message(),
        "Error: could not reach the writeup service"
    );
}
