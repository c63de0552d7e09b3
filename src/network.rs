use std::time::Duration;

use bytes::Bytes;
use hyper::client::HttpConnector;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use hyper::{Body, Client, Request, Response, Uri};
use hyper_tls::HttpsConnector;
use tracing::debug;
use url::Url;

use crate::error::{Result, StreamError};

const MAX_REDIRECTS: usize = 5;

/// 访问后端 API 和上游媒体地址共用的 HTTP(S) 客户端
#[derive(Clone)]
pub struct NetworkClient {
    client: Client<HttpsConnector<HttpConnector>>,
    timeout: Duration,
}

impl NetworkClient {
    pub fn new(timeout: Duration) -> Self {
        let https = HttpsConnector::new();
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build::<_, Body>(https);
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 发起 GET 请求，响应体不读取，由调用方决定是缓冲还是直接转发。
    /// 自动跟随最多 `MAX_REDIRECTS` 次重定向，`Location` 相对当前地址解析。
    /// 超时按每一跳计算，只覆盖到收到响应头为止。
    pub async fn get(&self, url: &str, headers: HeaderMap) -> Result<Response<Body>> {
        let mut current = Url::parse(url)
            .map_err(|e| StreamError::InvalidInput(format!("Invalid URL {}: {}", url, e)))?;
        let mut redirects = 0;

        loop {
            let resp = self.send(current.as_str(), headers.clone()).await?;
            if !resp.status().is_redirection() {
                return Ok(resp);
            }

            let next = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| current.join(location).ok());
            match next {
                Some(next) if redirects < MAX_REDIRECTS => {
                    debug!("{} redirected ({}) to {}", current, resp.status(), next);
                    redirects += 1;
                    current = next;
                }
                _ => return Ok(resp),
            }
        }
    }

    async fn send(&self, url: &str, headers: HeaderMap) -> Result<Response<Body>> {
        let uri: Uri = url
            .parse()
            .map_err(|e| StreamError::InvalidInput(format!("Invalid URL {}: {}", url, e)))?;

        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(req_headers) = builder.headers_mut() {
            req_headers.extend(headers);
        }
        let req = builder
            .body(Body::empty())
            .map_err(|e| StreamError::Network(e.to_string()))?;

        debug!("GET {}", url);
        match tokio::time::timeout(self.timeout, self.client.request(req)).await {
            Ok(resp) => Ok(resp?),
            Err(_) => Err(StreamError::Timeout(format!(
                "No response from {} within {:?}",
                url, self.timeout
            ))),
        }
    }

    /// 读取完整响应体，非 2xx 返回 `StreamError::Http`
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        let resp = self.get(url, HeaderMap::new()).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StreamError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = tokio::time::timeout(self.timeout, hyper::body::to_bytes(resp.into_body()))
            .await
            .map_err(|_| StreamError::Timeout(format!("Reading body of {} timed out", url)))??;
        debug!("Received {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

/// 构造请求头，忽略无法表示为 header 的值
pub fn header_map<'a>(pairs: impl IntoIterator<Item = (HeaderName, &'a str)>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(name, value);
        }
    }
    headers
}


#[cfg(test)]
mod tests {
    use super::test_support::serve;
    use super::*;
    use hyper::header::USER_AGENT;

    #[tokio::test]
    async fn get_bytes_reads_body_and_maps_status() {
        let addr = serve(|req: Request<Body>| match req.uri().path() {
            "/ok" => Response::new(Body::from("hello")),
            _ => Response::builder().status(404).body(Body::empty()).unwrap(),
        })
        .await;

        let client = NetworkClient::new(Duration::from_secs(5));
        let body = client.get_bytes(&format!("http://{}/ok", addr)).await.unwrap();
        assert_eq!(&body[..], b"hello");

        match client.get_bytes(&format!("http://{}/missing", addr)).await {
            Err(StreamError::Http { status, .. }) => assert_eq!(status, 404),
            other => panic!("unexpected result: {:?}", other.map(|b| b.len())),
        }
    }

    #[tokio::test]
    async fn forwards_request_headers() {
        let addr = serve(|req: Request<Body>| {
            let ua = req
                .headers()
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Response::new(Body::from(ua))
        })
        .await;

        let client = NetworkClient::new(Duration::from_secs(5));
        let resp = client
            .get(
                &format!("http://{}/", addr),
                header_map([(USER_AGENT, "test-agent/1.0")]),
            )
            .await
            .unwrap();
        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(&body[..], b"test-agent/1.0");
    }

    #[tokio::test]
    async fn follows_redirects_with_relative_location() {
        let addr = serve(|req: Request<Body>| match req.uri().path() {
            "/start" => Response::builder()
                .status(302)
                .header(LOCATION, "/moved/here")
                .body(Body::empty())
                .unwrap(),
            "/moved/here" => Response::builder()
                .status(301)
                .header(LOCATION, "final")
                .body(Body::empty())
                .unwrap(),
            "/moved/final" => Response::new(Body::from("done")),
            _ => Response::builder()
                .status(302)
                .header(LOCATION, "/loop")
                .body(Body::empty())
                .unwrap(),
        })
        .await;

        let client = NetworkClient::new(Duration::from_secs(5));
        let body = client.get_bytes(&format!("http://{}/start", addr)).await.unwrap();
        assert_eq!(&body[..], b"done");

        // 超过跳转次数后原样返回最后的 3xx
        let resp = client
            .get(&format!("http://{}/loop", addr), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(resp.status(), 302);
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        let client = NetworkClient::new(Duration::from_secs(1));
        assert!(matches!(
            client.get_bytes("not a url").await,
            Err(StreamError::InvalidInput(_))
        ));
    }
}
