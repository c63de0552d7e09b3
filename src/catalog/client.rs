use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::feed::{ListQuery, VideoSource};
use super::types::{Category, DataResponse, DetailResponse, ListResponse, VideoClass};
use crate::config::ApiConfig;
use crate::error::{Result, StreamError};
use crate::network::NetworkClient;

const LIST_PATH: &str = "/api/v1/video/list";
const DETAIL_PATH: &str = "/api/v1/video/get";
const CATEGORY_PATH: &str = "/api/v1/category/list";
const VIDEO_CLASS_PATH: &str = "/api/v1/video_class/list";

/// 后端视频 API 客户端
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    network: NetworkClient,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StreamError::Config(format!("Invalid API base url {}: {}", base_url, e)))?;
        Ok(Self {
            base_url,
            network: NetworkClient::new(timeout),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(&config.base_url, config.timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 接口路径拼在基础地址的路径之后，保留 `https://host/backend` 这类前缀
    fn endpoint(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}{}", prefix, path));
        url.set_query(query);
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let body = self.network.get_bytes(url.as_str()).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn list_videos(&self, query: &ListQuery) -> Result<ListResponse> {
        let url = self.endpoint(LIST_PATH, Some(&query.to_query_string()));
        let resp: ListResponse = self.get_json(url).await?;
        debug!(
            "Listed {} of {} videos (page {})",
            resp.data.len(),
            resp.total,
            query.page
        );
        Ok(resp)
    }

    /// 视频详情，`Data` 为空时返回 None。播放地址已解码。
    pub async fn get_video(&self, id: i64) -> Result<Option<DetailResponse>> {
        let url = self.endpoint(DETAIL_PATH, Some(&format!("Id={}", id)));
        let mut resp: DetailResponse = self.get_json(url).await?;
        match resp.data.as_mut() {
            Some(video) => {
                video.decode_playback_urls();
                Ok(Some(resp))
            }
            None => Ok(None),
        }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let url = self.endpoint(CATEGORY_PATH, None);
        let resp: DataResponse<Vec<Category>> = self.get_json(url).await?;
        Ok(resp.data)
    }

    pub async fn list_video_classes(&self) -> Result<Vec<VideoClass>> {
        let url = self.endpoint(VIDEO_CLASS_PATH, None);
        let resp: DataResponse<Vec<VideoClass>> = self.get_json(url).await?;
        Ok(resp.data)
    }

    pub async fn list_videos_or_default(&self, query: &ListQuery) -> ListResponse {
        self.list_videos(query).await.unwrap_or_else(|e| {
            warn!("Failed to list videos: {}", e);
            ListResponse::default()
        })
    }

    pub async fn get_video_or_default(&self, id: i64) -> Option<DetailResponse> {
        self.get_video(id).await.unwrap_or_else(|e| {
            warn!("Failed to fetch video {}: {}", id, e);
            None
        })
    }

    pub async fn list_categories_or_default(&self) -> Vec<Category> {
        self.list_categories().await.unwrap_or_else(|e| {
            warn!("Failed to fetch categories: {}", e);
            Vec::new()
        })
    }

    pub async fn list_video_classes_or_default(&self) -> Vec<VideoClass> {
        self.list_video_classes().await.unwrap_or_else(|e| {
            warn!("Failed to fetch video classes: {}", e);
            Vec::new()
        })
    }
}

#[async_trait]
impl VideoSource for ApiClient {
    async fn list_videos(&self, query: &ListQuery) -> Result<ListResponse> {
        ApiClient::list_videos(self, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::test_support::serve;
    use hyper::{Body, Request, Response};

    fn backend(req: Request<Body>) -> Response<Body> {
        let query = req.uri().query().unwrap_or_default().to_string();
        let body = match req.uri().path() {
            "/api/v1/video/list" => format!(
                r#"{{"Data":[{{"Id":1,"Title":"{}"}}],"Total":31,"LastId":1}}"#,
                query.replace('"', "")
            ),
            "/api/v1/video/get" if query == "Id=42" => r#"{"Data":{"Id":42,"Title":"星际穿越",
                "VideoUrlArr":[{"Url":"HD$https://a.example.com/hd.m3u8"}]},
                "Category":[{"Id":1,"Name":"电影"}]}"#
                .to_string(),
            "/api/v1/video/get" => r#"{"Data":null,"Category":null}"#.to_string(),
            "/api/v1/category/list" => {
                r#"{"Data":[{"Id":1,"Name":"类型","SonCategory":[{"Id":10,"Name":"动作"}]}]}"#
                    .to_string()
            }
            "/api/v1/video_class/list" => {
                r#"{"Data":[{"Id":3,"TypeId":6,"TypeName":"动作片","TypePid":1}]}"#.to_string()
            }
            _ => {
                return Response::builder()
                    .status(502)
                    .body(Body::from("bad gateway"))
                    .unwrap()
            }
        };
        Response::new(Body::from(body))
    }

    async fn client() -> ApiClient {
        let addr = serve(backend).await;
        ApiClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn lists_videos_with_query() {
        let client = client().await;
        let resp = client.list_videos(&ListQuery::search("abc")).await.unwrap();
        assert_eq!(resp.total, 31);
        assert_eq!(
            resp.data[0].title,
            "Page=1&PageSize=10&Id=0&KeyWord=abc&CategoryId=&TypeId=0"
        );
    }

    #[tokio::test]
    async fn detail_is_decoded() {
        let client = client().await;
        let detail = client.get_video(42).await.unwrap().unwrap();
        let video = detail.data.unwrap();
        assert_eq!(video.playback(0, 0).unwrap().url, "https://a.example.com/hd.m3u8");
        assert_eq!(detail.category[0].name, "电影");

        assert!(client.get_video(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn categories_and_classes() {
        let client = client().await;
        let categories = client.list_categories().await.unwrap();
        assert_eq!(categories[0].son_category[0].id, 10);
        let classes = client.list_video_classes().await.unwrap();
        assert_eq!(classes[0].type_name, "动作片");
    }

    #[tokio::test]
    async fn failures_degrade_to_empty() {
        let addr = serve(|_req: Request<Body>| {
            Response::builder().status(500).body(Body::empty()).unwrap()
        })
        .await;
        let client = ApiClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();

        assert!(matches!(
            client.list_categories().await,
            Err(StreamError::Http { status: 500, .. })
        ));
        assert!(client.list_categories_or_default().await.is_empty());
        assert!(client.list_videos_or_default(&ListQuery::default()).await.data.is_empty());
        assert!(client.get_video_or_default(1).await.is_none());
        assert!(client.list_video_classes_or_default().await.is_empty());
    }

    #[tokio::test]
    async fn base_url_path_prefix_is_kept() {
        let addr = serve(|req: Request<Body>| match req.uri().path() {
            "/backend/api/v1/category/list" => {
                Response::new(Body::from(r#"{"Data":[{"Id":5,"Name":"剧集"}]}"#))
            }
            _ => Response::builder().status(404).body(Body::empty()).unwrap(),
        })
        .await;

        for base in [format!("http://{}/backend", addr), format!("http://{}/backend/", addr)] {
            let client = ApiClient::new(&base, Duration::from_secs(5)).unwrap();
            let categories = client.list_categories().await.unwrap();
            assert_eq!(categories[0].id, 5);
        }
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        assert!(matches!(
            ApiClient::new("not a url", Duration::from_secs(1)),
            Err(StreamError::Config(_))
        ));
    }
}
