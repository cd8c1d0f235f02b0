//! Calling remote XML-RPC services
//!
//! The HTTP exchange sits behind the [`Transport`] trait. [`HttpTransport`]
//! is a plain HTTP/1.1 client built on hyper; TLS is not supported.

use crate::error::RequestError;
use crate::protocol::{Request, Response};
use crate::value::Value;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::{Method, Uri};
use hyper_util::rt::TokioIo;
use std::future::Future;
use tokio::net::TcpStream;
use tracing::debug;

/// Content type of every XML-RPC body
pub const XML_CONTENT_TYPE: &str = "text/xml";

/// Status line and body returned by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub reason: String,
    pub body: Bytes,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivers a POST body to a URL and returns the server's reply.
pub trait Transport {
    fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
    ) -> impl Future<Output = Result<HttpReply, RequestError>> + Send;
}

/// HTTP/1.1 over a fresh TCP connection per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
    ) -> Result<HttpReply, RequestError> {
        let uri: Uri = url
            .parse()
            .map_err(|e| RequestError::InvalidUrl(format!("{}: {}", url, e)))?;
        if uri.scheme_str() != Some("http") {
            return Err(RequestError::InvalidUrl(format!(
                "{}: only http:// URLs are supported",
                url
            )));
        }
        let host = uri
            .host()
            .map(connect_host)
            .ok_or_else(|| RequestError::InvalidUrl(format!("{}: missing host", url)))?;
        let port = uri.port_u16().unwrap_or(80);
        let authority = uri
            .authority()
            .map(|a| a.as_str().to_string())
            .unwrap_or_else(|| host.to_string());
        let path = uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("HTTP connection closed with error: {}", e);
            }
        });

        let request = hyper::Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(HOST, authority)
            .header(CONTENT_TYPE, content_type)
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        let response = sender
            .send_request(request)
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?
            .to_bytes();

        Ok(HttpReply {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

/// The host as a socket address lookup needs it: IPv6 literals lose their brackets.
fn connect_host(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

/// POSTs an already built request and decodes the reply.
pub async fn execute<T: Transport>(
    transport: &T,
    url: &str,
    request: &Request,
) -> Result<Response, RequestError> {
    let xml = request.xml().ok_or_else(|| {
        RequestError::InvalidOptions("Request has no XML text to send".to_string())
    })?;
    debug!("POST {} ({} bytes)", url, xml.len());

    let reply = transport
        .post(url, XML_CONTENT_TYPE, xml.to_string())
        .await?;
    if !reply.is_success() {
        return Err(RequestError::Http {
            status: reply.status,
            reason: reply.reason,
        });
    }

    let body = String::from_utf8(reply.body.to_vec())
        .map_err(|e| RequestError::Transport(format!("response body is not UTF-8: {}", e)))?;
    Response::parse(body)
}

/// Calls `method` on the service at `url`.
///
/// Non-success HTTP statuses fail with [`RequestError::Http`]; XML-RPC
/// faults come back as a [`Response`] whose [`Response::is_valid`] is false.
pub async fn send_request<T: Transport>(
    transport: &T,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<Response, RequestError> {
    let request = Request::new(method, params)?;
    execute(transport, url, &request).await
}

/// A service endpoint bound to a transport.
#[derive(Debug, Clone)]
pub struct Client<T = HttpTransport> {
    url: String,
    transport: T,
    indent: usize,
}

impl Client<HttpTransport> {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_transport(url, HttpTransport)
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(url: impl Into<String>, transport: T) -> Self {
        Self {
            url: url.into(),
            transport,
            indent: 0,
        }
    }

    /// Indentation for the request documents this client sends.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Response, RequestError> {
        let request = Request::with_indent(method, params, self.indent)?;
        execute(&self.transport, &self.url, &request).await
    }
}
