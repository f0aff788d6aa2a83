//! # HTTP Server
//!
//! HTTP/1 server built on Hyper and Tokio.
//!
//! Every connection runs on its own task. Each request is read in full,
//! converted into a [`Request`] and handed to [`Application::handle`].
//! Ctrl-C stops accepting connections; in-flight connections get
//! [`ServerConfig::shutdown_timeout`] to finish.

use crate::application::Application;
use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Grace period for open connections after shutdown is requested
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 8000).into(),
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
        }
    }
}

/// Development HTTP server
#[derive(Debug, Clone)]
pub struct Server {
    config: ServerConfig,
    app: Arc<Application>,
}

impl Server {
    /// Create a server for `app`
    #[must_use]
    pub fn new(app: Application, config: ServerConfig) -> Self {
        Self {
            config,
            app: Arc::new(app),
        }
    }

    /// Server configuration
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the address is unavailable
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.address;
        let bind_error = |source| Error::BindError {
            address: addr.to_string(),
            source,
        };

        let socket = if addr.is_ipv4() {
            tokio::net::TcpSocket::new_v4()
        } else {
            tokio::net::TcpSocket::new_v6()
        }
        .map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(addr).map_err(bind_error)?;
        socket.listen(1024).map_err(bind_error)
    }

    /// Bind and serve until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if binding fails and `Error::Io` if
    /// accepting connections fails
    pub async fn serve(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve connections from `listener` until `shutdown` completes
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if accepting a connection fails
    pub async fn serve_with_shutdown<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local = listener.local_addr()?;
        info!("Server listening on http://{}", local);

        let active = Arc::new(AtomicUsize::new(0));
        let max_body_size = self.config.max_body_size;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = accept_result?;
                    let io = TokioIo::new(stream);
                    let app = self.app.clone();
                    let active = active.clone();

                    tokio::task::spawn(async move {
                        active.fetch_add(1, Ordering::Relaxed);
                        let service = service_fn(move |req| {
                            let app = app.clone();
                            async move {
                                handle_request(req, &app, remote_addr, max_body_size).await
                            }
                        });
                        if let Err(err) =
                            http1::Builder::new().serve_connection(io, service).await
                        {
                            error!("Error serving connection: {:?}", err);
                        }
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                () = &mut shutdown => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        let drain = async {
            while active.load(Ordering::Relaxed) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(self.config.shutdown_timeout, drain)
            .await
            .is_err()
        {
            info!(
                open = active.load(Ordering::Relaxed),
                "Shutdown timeout reached with open connections"
            );
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl-C handler: {e}");
        std::future::pending::<()>().await;
    }
}

async fn handle_request(
    req: hyper::Request<Incoming>,
    app: &Application,
    remote_addr: SocketAddr,
    max_body_size: usize,
) -> std::result::Result<hyper::Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match Request::from_hyper_with_limit(req, max_body_size).await {
        Ok(mut request) => {
            request.set_header("x-client-ip", remote_addr.ip().to_string());
            app.handle(request)
        }
        Err(Error::PayloadTooLarge { limit, actual }) => {
            info!(limit, actual, "Rejected oversized request body");
            Response::aborted(413, "Payload Too Large")
        }
        Err(e) => {
            error!("Failed to parse request: {}", e);
            Response::aborted(400, "Bad Request")
        }
    };

    info!(
        "    {} - \"{} {}\" {}",
        remote_addr, method, path, response.status
    );
    Ok(response.into_hyper())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppContext;
    use crate::route::{Handler, RouteTable};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    fn app() -> Application {
        let mut routes = RouteTable::new();
        routes.get("/", Handler::function(|_req, _ctx| Ok("home")));
        routes.post(
            "/echo",
            Handler::function(|req, _ctx| Ok(req.input_str("name").unwrap_or("none").to_string())),
        );
        Application::new(AppContext::default(), routes).unwrap()
    }

    async fn roundtrip(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address.port(), 8000);
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let config = ServerConfig {
            address: ([127, 0, 0, 1], 0).into(),
            max_body_size: 1024,
            shutdown_timeout: Duration::from_secs(1),
        };
        let server = Server::new(app(), config);
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            server
                .serve_with_shutdown(listener, async {
                    stopped.await.ok();
                })
                .await
        });

        let home = roundtrip(
            addr,
            "GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(home.starts_with("HTTP/1.1 200 OK"));
        assert!(home.contains("x-request-id"));
        assert!(home.ends_with("home"));

        let form = roundtrip(
            addr,
            "POST /echo HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\
             Content-Type: application/x-www-form-urlencoded\r\nContent-Length: 9\r\n\r\nname=John",
        )
        .await;
        assert!(form.ends_with("John"));

        let missing = roundtrip(
            addr,
            "GET /nope HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(missing.starts_with("HTTP/1.1 404 Not Found"));
        assert!(missing.ends_with("Page not found"));

        stop.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bind_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            address: taken.local_addr().unwrap(),
            ..ServerConfig::default()
        };
        let err = Server::new(app(), config).bind().await;
        assert!(matches!(err, Err(Error::BindError { .. })));
    }
}
