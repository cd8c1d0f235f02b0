/// Live server tests
///
/// Each test binds the server to an ephemeral port, talks to it over real
/// TCP and shuts it down through the shutdown future.
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use xmlrpc_bin::{ServerState, demo_dispatcher, serve};
use xmlrpc_config::Config;
use xmlrpc_core::{HttpTransport, RequestError, Transport, Value, XML_CONTENT_TYPE, send_request};

struct TestServer {
    url: String,
    addr: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn start_server(max_body_bytes: usize) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = Config::parse(&format!(
        "listen_addr: \"{}\"\nmax_body_bytes: {}\n",
        addr, max_body_bytes
    ))
    .unwrap();
    let state = Arc::new(ServerState::from_config(&config, demo_dispatcher()));

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        serve(listener, state, async {
            let _ = rx.await;
        })
        .await
        .unwrap();
    });

    TestServer {
        url: format!("http://{}/RPC2", addr),
        addr: addr.to_string(),
        shutdown: Some(tx),
    }
}

/// Sends a raw HTTP/1.1 request and returns the status line
async fn raw_status(addr: &str, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let text = String::from_utf8_lossy(&response);
    text.lines().next().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_get_state_name() {
    let server = start_server(1024 * 1024).await;
    let response = send_request(
        &HttpTransport,
        &server.url,
        "examples.getStateName",
        vec![Value::Int(41)],
    )
    .await
    .unwrap();
    assert!(response.is_valid());
    assert_eq!(response.value().unwrap(), &Value::from("South Dakota"));
}

#[tokio::test]
async fn test_add() {
    let server = start_server(1024 * 1024).await;
    let response = send_request(
        &HttpTransport,
        &server.url,
        "add",
        vec![Value::Int(1), Value::Int(2)],
    )
    .await
    .unwrap();
    assert_eq!(
        response.xml().unwrap(),
        "<methodResponse><params><param><value><int>3</int></value></param></params></methodResponse>"
    );
}

#[tokio::test]
async fn test_fault_over_http() {
    let server = start_server(1024 * 1024).await;
    let response = send_request(&HttpTransport, &server.url, "system.shutdown", vec![])
        .await
        .unwrap();
    assert!(!response.is_valid());
    assert_eq!(response.fault_code(), Some(-2));
    assert_eq!(response.error().as_deref(), Some("Unknown method (-2)"));
}

#[tokio::test]
async fn test_wrong_path_is_not_found() {
    let server = start_server(1024 * 1024).await;
    let url = server.url.replace("/RPC2", "/other");
    let err = send_request(&HttpTransport, &url, "add", vec![])
        .await
        .unwrap_err();
    match err {
        RequestError::Http { status, reason } => {
            assert_eq!(status, 404);
            assert_eq!(reason, "Not Found");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_non_xmlrpc_body_is_bad_request() {
    let server = start_server(1024 * 1024).await;
    let reply = HttpTransport
        .post(
            &server.url,
            XML_CONTENT_TYPE,
            "<data><value>test</value></data>".to_string(),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, 400);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let server = start_server(64).await;
    let reply = HttpTransport
        .post(
            &server.url,
            XML_CONTENT_TYPE,
            format!(
                "<methodCall><methodName>{}</methodName></methodCall>",
                "x".repeat(128)
            ),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, 413);
}

#[tokio::test]
async fn test_get_not_allowed() {
    let server = start_server(1024 * 1024).await;
    let status = raw_status(
        &server.addr,
        "GET /RPC2 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert_eq!(status, "HTTP/1.1 405 Method Not Allowed");
}

#[tokio::test]
async fn test_response_content_type() {
    let server = start_server(1024 * 1024).await;
    let body = "<methodCall><methodName>add</methodName><params>\
                <param><value><int>2</int></value></param>\
                <param><value><int>2</int></value></param></params></methodCall>";
    let request = format!(
        "POST /RPC2 HTTP/1.1\r\nHost: localhost\r\nContent-Type: text/xml\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let mut stream = TcpStream::connect(&server.addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let text = String::from_utf8_lossy(&response).to_lowercase();

    assert!(text.starts_with("http/1.1 200 ok"));
    assert!(text.contains("content-type: text/xml"));
    assert!(text.ends_with("<value><int>4</int></value></param></params></methodresponse>"));
}
