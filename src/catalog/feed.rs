use async_trait::async_trait;
use tracing::{debug, warn};
use url::form_urlencoded;

use super::types::{ListResponse, Video};
use crate::error::Result;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// `/api/v1/video/list` 的查询参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub id: i64,
    pub keyword: String,
    /// 逗号分隔的二级分类 ID
    pub category_id: String,
    pub type_id: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            id: 0,
            keyword: String::new(),
            category_id: String::new(),
            type_id: 0,
        }
    }
}

impl ListQuery {
    pub fn search(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Default::default()
        }
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("Page", &self.page.to_string())
            .append_pair("PageSize", &self.page_size.to_string())
            .append_pair("Id", &self.id.to_string())
            .append_pair("KeyWord", &self.keyword)
            .append_pair("CategoryId", &self.category_id)
            .append_pair("TypeId", &self.type_id.to_string())
            .finish()
    }
}

#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn list_videos(&self, query: &ListQuery) -> Result<ListResponse>;
}

/// 首页的无限滚动列表
pub struct InfiniteFeed<S> {
    source: S,
    query: ListQuery,
    videos: Vec<Video>,
    loaded_pages: u32,
    total: Option<u64>,
}

impl<S: VideoSource> InfiniteFeed<S> {
    pub fn new(source: S, query: ListQuery) -> Self {
        Self {
            source,
            query,
            videos: Vec::new(),
            loaded_pages: 0,
            total: None,
        }
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// 还没加载过时总是 true
    pub fn has_more(&self) -> bool {
        match self.total {
            None => true,
            Some(total) => (self.videos.len() as u64) < total,
        }
    }

    /// 加载下一页并追加，返回新增条数。失败时保持原状并返回 0。
    pub async fn load_next(&mut self) -> usize {
        if !self.has_more() {
            return 0;
        }

        let query = self.query.with_page(self.loaded_pages + 1);
        match self.source.list_videos(&query).await {
            Ok(resp) => {
                let added = resp.data.len();
                debug!("Loaded page {} with {} videos", query.page, added);
                self.videos.extend(resp.data);
                self.loaded_pages = query.page;
                self.total = Some(resp.total);
                // 服务端不再返回数据时停止继续请求
                if added == 0 {
                    self.total = Some(self.videos.len() as u64);
                }
                added
            }
            Err(e) => {
                warn!("Failed to load page {}: {}", query.page, e);
                0
            }
        }
    }

    /// 下拉刷新：从第一页重新加载，加载失败时保留旧数据
    pub async fn refresh(&mut self) -> usize {
        let query = self.query.with_page(1);
        match self.source.list_videos(&query).await {
            Ok(resp) => {
                let count = resp.data.len();
                self.videos = resp.data;
                self.loaded_pages = 1;
                self.total = Some(resp.total);
                count
            }
            Err(e) => {
                warn!("Failed to refresh feed: {}", e);
                0
            }
        }
    }

    /// 更换筛选条件，清空已加载的数据
    pub fn set_query(&mut self, query: ListQuery) {
        if query != self.query {
            self.query = query;
            self.videos.clear();
            self.loaded_pages = 0;
            self.total = None;
        }
    }
}
