pub mod handlers;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{ALLOW, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Registry, TextEncoder};
use std::convert::Infallible;
use std::error::Error;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use xmlrpc_config::Config;
use xmlrpc_core::{
    Client, DispatchMetrics, Dispatcher, Payload, Value, XML_CONTENT_TYPE, classify_payload,
};

pub use handlers::demo_dispatcher;

/// Everything a connection needs to answer calls.
#[derive(Debug)]
pub struct ServerState {
    pub dispatcher: Dispatcher,
    pub path: String,
    pub max_body_bytes: usize,
}

impl ServerState {
    pub fn from_config(config: &Config, dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: dispatcher.with_indent(config.indent),
            path: config.path.clone(),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
                .add_directive("xmlrpc=debug".parse()?),
        )
        .with_target(false)
        .json()
        .init();
    Ok(())
}

/// Loads the configuration and serves the demonstration methods until Ctrl-C.
pub async fn run(config_path: &Path) -> Result<(), Box<dyn Error>> {
    init_logging()?;

    let config = Config::from_file(config_path)?;

    let mut dispatcher = demo_dispatcher();
    if config.metrics.enabled {
        let registry = Registry::new();
        dispatcher = dispatcher.with_metrics(DispatchMetrics::new(&registry)?);
        let metrics_addr: SocketAddr = config.metrics.address.parse()?;
        let metrics_listener = TcpListener::bind(metrics_addr).await?;
        info!("Serving metrics on {}", metrics_addr);
        tokio::spawn(serve_metrics(metrics_listener, registry));
    }

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Accepting XML-RPC calls on http://{}{}", addr, config.path);

    let state = Arc::new(ServerState::from_config(&config, dispatcher));
    serve(listener, state, async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Received shutdown signal");
    })
    .await?;

    info!("Shutting down server");
    Ok(())
}

/// Calls `method` on the endpoint named in the configuration's `client`
/// section and prints the outcome.
pub async fn call(config_path: &Path, method: &str, args: &[String]) -> Result<(), Box<dyn Error>> {
    let config = Config::from_file(config_path)?;
    let client_config = config
        .client
        .ok_or("configuration has no client section")?;

    let client = Client::new(client_config.url).with_indent(client_config.indent);
    let params = args.iter().map(|arg| parse_arg(arg)).collect();
    let response = client.call(method, params).await?;

    match response.error() {
        Some(error) => Err(error.into()),
        None => {
            println!("{:?}", response.value()?);
            Ok(())
        }
    }
}

/// Command-line parameters are ints, doubles or booleans when they look
/// like one, strings otherwise.
fn parse_arg(arg: &str) -> Value {
    if let Ok(int) = arg.parse::<i64>() {
        Value::Int(int)
    } else if let Ok(double) = arg.parse::<f64>() {
        Value::Double(double)
    } else if let Ok(boolean) = arg.parse::<bool>() {
        Value::Bool(boolean)
    } else {
        Value::from(arg)
    }
}

/// Accepts connections on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let state = state.clone();
                        tokio::spawn(async move {
                            let service = service_fn(move |req| handle(req, state.clone()));
                            if let Err(err) = http1::Builder::new()
                                .serve_connection(TokioIo::new(stream), service)
                                .await
                            {
                                debug!("Connection from {} ended with error: {}", peer, err);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
        }
    }

    Ok(())
}

fn reply(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.uri().path() != state.path {
        return Ok(reply(StatusCode::NOT_FOUND, "Not Found"));
    }
    if req.method() != Method::POST {
        let mut response = reply(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        response
            .headers_mut()
            .insert(ALLOW, hyper::header::HeaderValue::from_static("POST"));
        return Ok(response);
    }

    let body = match Limited::new(req.into_body(), state.max_body_bytes)
        .collect()
        .await
    {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.is::<http_body_util::LengthLimitError>() => {
            warn!("Rejecting body larger than {} bytes", state.max_body_bytes);
            return Ok(reply(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"));
        }
        Err(err) => {
            debug!("Failed to read request body: {}", err);
            return Ok(reply(StatusCode::BAD_REQUEST, "Bad Request"));
        }
    };

    match classify_payload(&body) {
        Payload::XmlRpc => {}
        Payload::Xml(root) => {
            debug!("Rejecting XML document with root <{}>", root);
            return Ok(reply(StatusCode::BAD_REQUEST, "Expected an XML-RPC methodCall"));
        }
        Payload::Unknown => {
            return Ok(reply(StatusCode::BAD_REQUEST, "Expected an XML-RPC methodCall"));
        }
    }
    let xml = match String::from_utf8(body.to_vec()) {
        Ok(xml) => xml,
        Err(_) => return Ok(reply(StatusCode::BAD_REQUEST, "Body is not UTF-8")),
    };

    // Handlers are synchronous and may be slow.
    let dispatched = tokio::task::spawn_blocking(move || {
        state
            .dispatcher
            .handle_request(&xml)
            .xml()
            .map(str::to_string)
    })
    .await;

    match dispatched {
        Ok(Some(xml)) => {
            let mut response = reply(StatusCode::OK, xml);
            response.headers_mut().insert(
                CONTENT_TYPE,
                hyper::header::HeaderValue::from_static(XML_CONTENT_TYPE),
            );
            Ok(response)
        }
        Ok(None) => {
            error!("Dispatcher produced a response without text");
            Ok(reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"))
        }
        Err(e) => {
            error!("Dispatch task failed: {}", e);
            Ok(reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"))
        }
    }
}

/// Serves the Prometheus text format for `registry` on every request.
pub async fn serve_metrics(listener: TcpListener, registry: Registry) {
    loop {
        if let Ok((stream, _)) = listener.accept().await {
            let registry = registry.clone();
            let io = TokioIo::new(stream);

            tokio::spawn(async move {
                let service = service_fn(move |_req: Request<Incoming>| {
                    let registry = registry.clone();
                    async move {
                        let encoder = TextEncoder::new();
                        let metric_families = registry.gather();
                        let mut buffer = vec![];
                        encoder
                            .encode(&metric_families, &mut buffer)
                            .map_err(|e| format!("Metrics encoding error: {}", e))?;
                        Ok::<_, String>(Response::new(Full::new(Bytes::from(buffer))))
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Metrics server error: {}", err);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg("41"), Value::Int(41));
        assert_eq!(parse_arg("2.5"), Value::Double(2.5));
        assert_eq!(parse_arg("true"), Value::Bool(true));
        assert_eq!(parse_arg("South Dakota"), Value::from("South Dakota"));
    }

    #[test]
    fn test_state_from_config() {
        let config = Config::parse(
            r#"
listen_addr: "127.0.0.1:0"
path: "/xmlrpc"
max_body_bytes: 10
indent: 2
"#,
        )
        .unwrap();
        let state = ServerState::from_config(&config, demo_dispatcher());
        assert_eq!(state.path, "/xmlrpc");
        assert_eq!(state.max_body_bytes, 10);
        assert!(state.dispatcher.has_method("add"));
    }
}
