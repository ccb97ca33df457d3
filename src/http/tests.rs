use super::*;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

fn test_client() -> HttpClient {
    HttpClient::new(ApiKey::new("sk-test"), Duration::from_secs(5))
        .with_backoff(Duration::from_millis(10))
}

async fn post_in_background(client: HttpClient, url: Url, body: &'static str) -> Result<String> {
    tokio::task::spawn_blocking(move || client.post_json(&url, body))
        .await
        .expect("blocking task should not panic")
}

#[test]
fn endpoint_keeps_versioned_base_path() {
    let url = endpoint("https://api.openai.com/v1", "embeddings").expect("should build url");
    assert_eq!(url.as_str(), "https://api.openai.com/v1/embeddings");

    let url = endpoint("https://api.openai.com/v1/", "/chat/completions").expect("should build url");
    assert_eq!(url.as_str(), "https://api.openai.com/v1/chat/completions");

    let url = endpoint("http://localhost:8080", "embeddings").expect("should build url");
    assert_eq!(url.as_str(), "http://localhost:8080/embeddings");
}

#[test]
fn endpoint_rejects_invalid_base() {
    assert!(endpoint("not a url", "embeddings").is_err());
}

#[test]
fn retry_attempts_never_zero() {
    let client = test_client().with_retry_attempts(0);
    assert_eq!(client.retry_attempts(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn post_sends_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/echo"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let url = endpoint(&format!("{}/v1", server.uri()), "echo").expect("should build url");
    let response = post_in_background(test_client(), url, "{}")
        .await
        .expect("request should succeed");

    assert_eq!(response, "ok");
}

#[tokio::test(flavor = "multi_thread")]
async fn retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .expect(1)
        .mount(&server)
        .await;

    let url = endpoint(&server.uri(), "flaky").expect("should build url");
    let response = post_in_background(test_client(), url, "{}")
        .await
        .expect("request should succeed after retries");

    assert_eq!(response, "recovered");
}

#[tokio::test(flavor = "multi_thread")]
async fn does_not_retry_client_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/denied"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let url = endpoint(&server.uri(), "denied").expect("should build url");
    let error = post_in_background(test_client(), url, "{}")
        .await
        .expect_err("401 should fail");

    assert!(
        error.to_string().contains("401"),
        "Did not find '401' in error: {}",
        error
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn gives_up_after_retry_budget() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let url = endpoint(&server.uri(), "down").expect("should build url");
    let client = test_client().with_retry_attempts(2);
    let result = post_in_background(client, url, "{}").await;

    assert!(result.is_err());
}
