use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Body, Method, Request, Response, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ProxyConfig;
use crate::error::{Result, StreamError};
use crate::network::{header_map, NetworkClient};
use crate::plugin::Plugin;
use crate::proxy::{with_cors, RouteHandler};
use crate::utils::{parse_http_url, query_param};

pub mod rewrite;

use rewrite::{is_manifest, rewrite_manifest};

pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// 重写后响应头里需要去掉的上游头
const STRIPPED_HEADERS: [header::HeaderName; 4] = [
    header::CONTENT_LENGTH,
    header::CONTENT_ENCODING,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
];

#[derive(Debug, Default)]
struct ProxyStats {
    requests: AtomicU64,
    manifests: AtomicU64,
    upstream_errors: AtomicU64,
}

/// `/api/proxy?url=` 路由：转发上游媒体并重写 m3u8 清单
pub struct HlsProxyPlugin {
    route: String,
    user_agent: String,
    network: NetworkClient,
    stats: ProxyStats,
}

impl HlsProxyPlugin {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            route: config.route.clone(),
            user_agent: config.user_agent.clone(),
            network: NetworkClient::new(config.timeout()),
            stats: ProxyStats::default(),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// 预检响应
    pub fn preflight() -> Response<Body> {
        let mut resp = with_cors(Response::new(Body::empty()));
        let headers = resp.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static("86400"),
        );
        resp
    }

    fn text_response(status: StatusCode, text: impl Into<String>) -> Response<Body> {
        let mut resp = Response::new(Body::from(text.into()));
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        with_cors(resp)
    }

    fn upstream_headers(&self, req: &Request<Body>, target: &Url) -> HeaderMap {
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(self.user_agent.as_str());
        let origin = target.origin().ascii_serialization();

        let mut headers = header_map([
            (header::USER_AGENT, user_agent),
            (header::REFERER, origin.as_str()),
        ]);
        // 分片的断点请求
        if let Some(range) = req.headers().get(header::RANGE) {
            headers.insert(header::RANGE, range.clone());
        }
        headers
    }

    async fn forward(&self, req: Request<Body>) -> Response<Body> {
        let Some(raw) = query_param(&req, "url") else {
            debug!("Proxy request without url parameter");
            return Self::text_response(StatusCode::BAD_REQUEST, "缺少 \"url\" 查询参数");
        };
        let Some(target) = parse_http_url(&raw) else {
            debug!("Proxy request with invalid url: {}", raw);
            return Self::text_response(StatusCode::BAD_REQUEST, "无效的URL格式");
        };

        let headers = self.upstream_headers(&req, &target);
        let upstream = match self.network.get(target.as_str(), headers).await {
            Ok(resp) => resp,
            Err(e) => {
                self.stats.upstream_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Upstream request to {} failed: {}", target, e);
                return Self::text_response(StatusCode::INTERNAL_SERVER_ERROR, "代理服务器内部错误。");
            }
        };

        let status = upstream.status();
        if !status.is_success() {
            self.stats.upstream_errors.fetch_add(1, Ordering::Relaxed);
            info!("Upstream {} returned {}", target, status);
            return Self::text_response(
                status,
                format!(
                    "目标服务器错误: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                ),
            );
        }

        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if is_manifest(&content_type, &target) {
            // 跳转后仍以请求的地址作为解析基准
            match self.rewrite(upstream, &target).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("Failed to rewrite manifest {}: {}", target, e);
                    Self::text_response(StatusCode::INTERNAL_SERVER_ERROR, "代理服务器内部错误。")
                }
            }
        } else {
            debug!("Streaming {} ({})", target, content_type);
            let (mut parts, body) = upstream.into_parts();
            parts.headers.remove(header::CONNECTION);
            parts.headers.remove(header::TRANSFER_ENCODING);
            with_cors(Response::from_parts(parts, body))
        }
    }

    async fn rewrite(&self, upstream: Response<Body>, target: &Url) -> Result<Response<Body>> {
        let (mut parts, body) = upstream.into_parts();
        let bytes = tokio::time::timeout(self.network.timeout(), hyper::body::to_bytes(body))
            .await
            .map_err(|_| StreamError::Timeout(format!("Reading manifest {} timed out", target)))??;

        let text = String::from_utf8_lossy(&bytes);
        let rewritten = rewrite_manifest(&text, target, &self.route);
        self.stats.manifests.fetch_add(1, Ordering::Relaxed);
        debug!("Rewrote manifest {} ({} bytes)", target, bytes.len());

        for name in STRIPPED_HEADERS.iter() {
            parts.headers.remove(name);
        }
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(MANIFEST_CONTENT_TYPE),
        );
        Ok(with_cors(Response::from_parts(parts, Body::from(rewritten))))
    }
}

#[async_trait]
impl Plugin for HlsProxyPlugin {
    fn name(&self) -> &str {
        "hls-proxy"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    async fn init(&self) -> Result<()> {
        info!("HLS proxy mounted at {}", self.route);
        Ok(())
    }

    async fn cleanup(&self) -> Result<()> {
        info!(
            "HLS proxy served {} requests, {} manifests, {} upstream errors",
            self.stats.requests.load(Ordering::Relaxed),
            self.stats.manifests.load(Ordering::Relaxed),
            self.stats.upstream_errors.load(Ordering::Relaxed)
        );
        Ok(())
    }
}

#[async_trait]
impl RouteHandler for HlsProxyPlugin {
    fn can_handle(&self, path: &str) -> bool {
        path == self.route
    }

    async fn handle(&self, req: Request<Body>) -> Result<Response<Body>> {
        self.stats.requests.fetch_add(1, Ordering::Relaxed);
        match *req.method() {
            Method::OPTIONS => Ok(Self::preflight()),
            Method::GET | Method::HEAD => Ok(self.forward(req).await),
            _ => Ok(Self::text_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed",
            )),
        }
    }
}
