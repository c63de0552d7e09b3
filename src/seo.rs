use serde::Serialize;

use crate::catalog::types::Video;

const TITLE_SUFFIX: &str = "-在线观看-下载";
const DEFAULT_DESCRIPTION: &str = "暂无简介";
const DEFAULT_GENRE: &str = "电影";
const DEFAULT_KEYWORDS: &str = "在线观看, 下载, 高清";

/// 详情页的 schema.org `Movie` 结构化数据
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieJsonLd {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@type")]
    pub kind: &'static str,
    pub name: String,
    pub description: String,
    pub image: String,
    pub alternate_name: Vec<String>,
    pub genre: Vec<String>,
    pub keywords: String,
}

/// 详情页的标题、描述和结构化数据
#[derive(Debug, Clone, PartialEq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub json_ld: MovieJsonLd,
}

impl PageMetadata {
    pub fn for_video(video: &Video) -> Self {
        let description = if video.describe.is_empty() {
            DEFAULT_DESCRIPTION.to_string()
        } else {
            video.describe.clone()
        };

        Self {
            title: format!("{}{}", video.title, TITLE_SUFFIX),
            description,
            json_ld: MovieJsonLd {
                context: "https://schema.org",
                kind: "Movie",
                name: video.title.clone(),
                description: video.describe.clone(),
                image: video.cover.clone(),
                alternate_name: video.aliases(),
                genre: vec![DEFAULT_GENRE.to_string()],
                keywords: DEFAULT_KEYWORDS.to_string(),
            },
        }
    }

    /// `<script type="application/ld+json">` 的内容
    pub fn json_ld_script(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(&self.json_ld)?)
    }
}
