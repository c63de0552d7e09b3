use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Result, StreamError};
use crate::logger::log_request;
use crate::plugin::Plugin;

/// 挂在代理服务器上的路由
#[async_trait]
pub trait RouteHandler: Plugin + Send + Sync {
    fn can_handle(&self, path: &str) -> bool;
    async fn handle(&self, req: Request<Body>) -> Result<Response<Body>>;
}

/// 加上允许跨域访问的响应头
pub fn with_cors(mut resp: Response<Body>) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, HEAD, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Range"),
    );
    resp
}

fn status_response(status: StatusCode, text: &'static str) -> Response<Body> {
    let mut resp = Response::new(Body::from(text));
    *resp.status_mut() = status;
    with_cors(resp)
}

#[derive(Clone)]
pub struct ProxyServer {
    addr: SocketAddr,
    handlers: Vec<Arc<dyn RouteHandler>>,
}

impl ProxyServer {
    pub fn new(addr: SocketAddr) -> Self {
        info!("Creating new proxy server on {}", addr);
        Self {
            addr,
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn RouteHandler>) {
        info!("Adding new handler: {}", handler.name());
        self.handlers.push(handler);
    }

    /// 绑定端口并在后台运行，返回实际监听地址。`shutdown` 完成后优雅退出。
    #[tracing::instrument(skip(self, shutdown))]
    pub fn start<F>(&self, shutdown: F) -> Result<(SocketAddr, JoinHandle<Result<()>>)>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!("Registered handlers: {}", self.handlers.len());
        let handlers = self.handlers.clone();

        let make_svc = make_service_fn(move |conn: &AddrStream| {
            let remote_addr = conn.remote_addr();
            debug!("New connection from: {}", remote_addr);
            let handlers = handlers.clone();

            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let handlers = handlers.clone();
                    async move { Ok::<_, Infallible>(Self::handle_request(req, &handlers).await) }
                }))
            }
        });

        let server = Server::try_bind(&self.addr)
            .map_err(|e| StreamError::Network(format!("Failed to bind {}: {}", self.addr, e)))?
            .serve(make_svc);
        let local_addr = server.local_addr();
        info!("Proxy server is ready to accept connections on {}", local_addr);

        let handle = tokio::spawn(async move {
            server.with_graceful_shutdown(shutdown).await.map_err(|e| {
                error!("Server error: {}", e);
                StreamError::Network(e.to_string())
            })
        });

        Ok((local_addr, handle))
    }

    /// 前台运行直到 `shutdown` 完成
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (_, handle) = self.start(shutdown)?;
        handle
            .await
            .map_err(|e| StreamError::Network(format!("Server task failed: {}", e)))?
    }

    async fn handle_request(req: Request<Body>, handlers: &[Arc<dyn RouteHandler>]) -> Response<Body> {
        let started = Instant::now();
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let resp = match handlers.iter().find(|h| h.can_handle(&path)) {
            Some(handler) => {
                debug!("Handler {} will process {} {}", handler.name(), method, path);
                match handler.handle(req).await {
                    Ok(resp) => resp,
                    Err(e) => {
                        warn!("Handler {} failed: {}", handler.name(), e);
                        status_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                    }
                }
            }
            None => {
                debug!("No handler found for request: {}", path);
                status_response(StatusCode::NOT_FOUND, "No handler found for this request")
            }
        };

        log_request(&method, &path, resp.status().as_u16(), started.elapsed());
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::network::test_support::serve;
    use crate::plugins::hls::HlsProxyPlugin;
    use hyper::Client;
    use tokio::sync::oneshot;

    struct FailingRoute;

    #[async_trait]
    impl Plugin for FailingRoute {
        fn name(&self) -> &str {
            "failing"
        }

        fn version(&self) -> &str {
            "0.0.1"
        }

        async fn init(&self) -> Result<()> {
            Ok(())
        }

        async fn cleanup(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl RouteHandler for FailingRoute {
        fn can_handle(&self, path: &str) -> bool {
            path == "/fail"
        }

        async fn handle(&self, _req: Request<Body>) -> Result<Response<Body>> {
            Err(StreamError::Plugin("boom".into()))
        }
    }

    fn server() -> ProxyServer {
        let mut server = ProxyServer::new(SocketAddr::from(([127, 0, 0, 1], 0)));
        server.add_handler(Arc::new(HlsProxyPlugin::new(&ProxyConfig::default())));
        server.add_handler(Arc::new(FailingRoute));
        server
    }

    #[tokio::test]
    async fn serves_proxy_route_end_to_end() {
        let upstream = serve(|_req: Request<Body>| {
            Response::builder()
                .header(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")
                .body(Body::from("#EXTM3U\n#EXTINF:10,\nsegment1.ts\n"))
                .unwrap()
        })
        .await;

        let (tx, rx) = oneshot::channel::<()>();
        let (addr, handle) = server()
            .start(async {
                let _ = rx.await;
            })
            .unwrap();

        let target = format!("http://{}/live/index.m3u8", upstream);
        let uri = format!(
            "http://{}/api/proxy?url={}",
            addr,
            urlencoding::encode(&target)
        );
        let resp = Client::new().get(uri.parse().unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains(&format!(
            "/api/proxy?url={}",
            urlencoding::encode(&format!("http://{}/live/segment1.ts", upstream))
        )));

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unknown_path_and_handler_error() {
        let (tx, rx) = oneshot::channel::<()>();
        let (addr, _handle) = server()
            .start(async {
                let _ = rx.await;
            })
            .unwrap();
        let client = Client::new();

        let resp = client
            .get(format!("http://{}/nope", addr).parse().unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = client
            .get(format!("http://{}/fail", addr).parse().unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        drop(tx);
    }
}
