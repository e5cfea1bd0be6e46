//! End-to-end tests of the reqwest-backed client against a local mock server.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use uptobox_dl::{
    ApiConfig, Client, DownloadConfig, DownloadOutcome, DownloadProgress, Downloader, Error,
    FileCode, FolderReference, NoProgress, WaitingTokenOrchestrator, collect_file_codes,
    enumerate_folder,
};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_client(server: &MockServer) -> Client {
    let config = ApiConfig::default()
        .with_https(false)
        .with_hostname(server.address().to_string())
        .with_token("userToken");
    Client::new(&config).unwrap()
}

fn envelope(status_code: i64, data: &serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "statusCode": status_code,
        "message": "",
        "data": data,
    }))
}

#[test]
fn missing_token_is_a_config_error() {
    let err = Client::new(&ApiConfig::default()).err().unwrap();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn resolves_and_downloads_a_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/link"))
        .and(query_param("token", "userToken"))
        .and(query_param("file_code", "abc123"))
        .and(query_param_is_missing("waitingToken"))
        .respond_with(envelope(0, &json!({"waiting": 0, "waitingToken": "wt"})))
        .expect(1)
        .mount(&server)
        .await;

    // Trailing comma as emitted by the live service.
    let dl_link = format!("{}/dl/abc123/report.pdf", server.uri());
    let body = format!(r#"{{"statusCode":0,"message":"Success","data":{{"dlLink":"{dl_link}",}},}}"#);
    Mock::given(method("GET"))
        .and(path("/api/link"))
        .and(query_param("waitingToken", "wt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dl/abc123/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pdf bytes"))
        .mount(&server)
        .await;

    let client = api_client(&server);
    let collected = collect_file_codes(&client, ["https://uptobox.com/abc123"])
        .await
        .unwrap();
    assert_eq!(collected.file_codes, vec![FileCode::from("abc123")]);

    let code = &collected.file_codes[0];
    let token = WaitingTokenOrchestrator::new(&client)
        .acquire(code, None)
        .await
        .unwrap();
    assert_eq!(token.token.as_deref(), Some("wt"));

    let link = client.get_download_link(code, &token).await.unwrap();
    assert_eq!(link.as_str(), dl_link);

    let dir = TempDir::new().unwrap();
    let downloader = Downloader::new(
        reqwest::Client::new(),
        DownloadConfig::new().with_output_dir(dir.path()),
    );
    let progress: Arc<dyn DownloadProgress> = Arc::new(NoProgress);
    let outcome = downloader.download(&link, &progress, None).await.unwrap();

    let DownloadOutcome::Downloaded { path, stats } = outcome else {
        panic!("expected a download");
    };
    assert_eq!(path, dir.path().join("report.pdf"));
    assert_eq!(stats.size, 9);
    assert_eq!(std::fs::read_to_string(path).unwrap(), "pdf bytes");
}

#[tokio::test]
async fn password_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/link"))
        .and(query_param("password", "hunter2"))
        .respond_with(envelope(0, &json!({"waiting": 0, "waitingToken": "wt"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_client(&server);
    let token = client
        .get_waiting_token(&FileCode::from("abc123"), Some("hunter2"))
        .await
        .unwrap();
    assert!(token.is_ready());
}

#[tokio::test]
async fn folder_enumeration_pages_until_empty() {
    let server = MockServer::start().await;
    let page = |start: usize, count: usize| {
        let list: Vec<_> = (start..start + count)
            .map(|i| json!({"file_name": format!("f{i}"), "file_code": format!("c{i}")}))
            .collect();
        envelope(0, &json!({ "list": list }))
    };

    for (offset, response) in [("0", page(0, 100)), ("100", page(100, 5)), ("200", page(0, 0))] {
        Mock::given(method("GET"))
            .and(path("/api/user/public"))
            .and(query_param("folder", "42"))
            .and(query_param("hash", "h4sh"))
            .and(query_param("limit", "100"))
            .and(query_param("offset", offset))
            .respond_with(response)
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = api_client(&server);
    let codes = enumerate_folder(&client, &FolderReference::new("42", "h4sh"))
        .await
        .unwrap();
    assert_eq!(codes.len(), 105);
    assert_eq!(codes[0], FileCode::from("c0"));
    assert_eq!(codes[104], FileCode::from("c104"));
}

#[tokio::test]
async fn fatal_status_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/link"))
        .respond_with(envelope(7, &json!("Invalid parameter")))
        .mount(&server)
        .await;

    let client = api_client(&server);
    let err = client
        .get_waiting_token(&FileCode::from("bad"), None)
        .await
        .unwrap_err();
    let client_error = err.as_client_error().unwrap();
    assert_eq!(client_error.to_string(), "Invalid parameter");
    assert_eq!(client_error.status_code, Some(7));
}

#[tokio::test]
async fn non_json_body_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let client = api_client(&server);
    let err = client
        .get_waiting_token(&FileCode::from("abc123"), None)
        .await
        .unwrap_err();
    assert!(err.is_transport());
}
