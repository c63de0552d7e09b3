use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::playback::source::parse_playback_urls;

/// 后端会把空数组/空字符串写成 `null`，统一按默认值处理
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 一个可选的清晰度/线路
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlaybackUrl {
    pub name: String,
    pub url: String,
}

impl PlaybackUrl {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// 播放源分组，`url` 是 `名称$地址#名称$地址` 格式的原始串
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VideoUrl {
    pub id: i64,
    pub video_id: i64,
    #[serde(deserialize_with = "null_default")]
    pub url: String,
    #[serde(deserialize_with = "null_default")]
    pub proxy: String,
    #[serde(deserialize_with = "null_default")]
    pub proxy_name: String,
    #[serde(rename = "PlaybackURL", deserialize_with = "null_default")]
    pub playback_urls: Vec<PlaybackUrl>,
}

impl VideoUrl {
    /// 解码 `url` 字段；已经带有解码结果时保持不变
    pub fn decode(&mut self) {
        if self.playback_urls.is_empty() {
            self.playback_urls = parse_playback_urls(&self.url);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Video {
    pub id: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_default")]
    pub title: String,
    #[serde(deserialize_with = "null_default")]
    pub describe: String,
    pub alias: Option<String>,
    pub connection: Option<i64>,
    #[serde(deserialize_with = "null_default")]
    pub url: String,
    #[serde(deserialize_with = "null_default")]
    pub cover: String,
    pub video_group_id: i64,
    pub duration: Option<String>,
    pub view_count: Option<u64>,
    pub browse: u64,
    #[serde(deserialize_with = "null_default")]
    pub keywords: String,
    pub type_id: i64,
    pub type_pid: i64,
    #[serde(deserialize_with = "null_default")]
    pub video_url_arr: Vec<VideoUrl>,
}

impl Video {
    /// 为所有分组解码播放地址
    pub fn decode_playback_urls(&mut self) {
        for group in &mut self.video_url_arr {
            group.decode();
        }
    }

    pub fn group(&self, idx: usize) -> Option<&VideoUrl> {
        self.video_url_arr.get(idx)
    }

    pub fn playback(&self, group_idx: usize, idx: usize) -> Option<&PlaybackUrl> {
        self.group(group_idx)?.playback_urls.get(idx)
    }

    /// 别名以 `/` 分隔
    pub fn aliases(&self) -> Vec<String> {
        self.alias
            .as_deref()
            .map(|alias| {
                alias
                    .split('/')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// 两级分类：顶级分类带 `SonCategory`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Category {
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    pub parent_id: i64,
    #[serde(rename = "Type")]
    pub kind: Option<i64>,
    pub video_count: i64,
    #[serde(deserialize_with = "null_default")]
    pub son_category: Vec<Category>,
}

impl Category {
    pub fn new(id: i64, name: impl Into<String>, children: Vec<Category>) -> Self {
        Self {
            id,
            name: name.into(),
            son_category: children,
            ..Default::default()
        }
    }

    /// 子分类按 ID 去重，保留首次出现的顺序
    pub fn unique_children(&self) -> Vec<&Category> {
        let mut seen = std::collections::HashSet::new();
        self.son_category
            .iter()
            .filter(|child| seen.insert(child.id))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VideoClass {
    pub id: i64,
    pub type_id: i64,
    #[serde(deserialize_with = "null_default")]
    pub type_name: String,
    pub type_pid: i64,
    #[serde(deserialize_with = "null_default")]
    pub video_class_son: Vec<VideoClass>,
}

/// `/api/v1/video/list` 的响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ListResponse {
    #[serde(deserialize_with = "null_default")]
    pub data: Vec<Video>,
    pub total: u64,
    pub last_id: i64,
}

/// `/api/v1/video/get` 的响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DetailResponse {
    pub data: Option<Video>,
    #[serde(deserialize_with = "null_default")]
    pub category: Vec<Category>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    rename_all = "PascalCase",
    default,
    bound(deserialize = "T: Deserialize<'de> + Default")
)]
pub struct DataResponse<T: Default> {
    #[serde(deserialize_with = "null_default")]
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str = r#"{
        "Data": {
            "Id": 42,
            "CreatedAt": "2025-01-22T15:16:00+08:00",
            "UpdatedAt": null,
            "DeletedAt": null,
            "Title": "星际穿越",
            "Describe": "<p>简介</p>",
            "Alias": "Interstellar / 星际启示录 / ",
            "Connection": null,
            "Url": "",
            "Cover": "https://img.example.com/1.jpg",
            "VideoGroupId": 0,
            "VideoUrlArr": [
                {
                    "Id": 1,
                    "VideoId": 42,
                    "Url": "HD$https://a.example.com/hd/index.m3u8#SD$https://a.example.com/sd/index.m3u8",
                    "Proxy": "a",
                    "ProxyName": "线路A"
                },
                {
                    "Id": 2,
                    "Url": null,
                    "PlaybackURL": [{"Name": "正片", "Url": "https://b.example.com/index.m3u8"}]
                }
            ]
        },
        "Category": null
    }"#;

    #[test]
    fn detail_response_tolerates_nulls() {
        let resp: DetailResponse = serde_json::from_str(DETAIL).unwrap();
        let video = resp.data.unwrap();
        assert_eq!(video.id, 42);
        assert_eq!(video.title, "星际穿越");
        assert!(video.created_at.is_some());
        assert!(video.updated_at.is_none());
        assert!(resp.category.is_empty());
        assert_eq!(video.video_url_arr.len(), 2);
        assert_eq!(video.video_url_arr[1].url, "");
    }

    #[test]
    fn decode_fills_missing_playback_lists_only() {
        let resp: DetailResponse = serde_json::from_str(DETAIL).unwrap();
        let mut video = resp.data.unwrap();
        video.decode_playback_urls();

        let first = &video.video_url_arr[0].playback_urls;
        assert_eq!(first.len(), 2);
        assert_eq!(first[0], PlaybackUrl::new("HD", "https://a.example.com/hd/index.m3u8"));

        let second = &video.video_url_arr[1].playback_urls;
        assert_eq!(second, &vec![PlaybackUrl::new("正片", "https://b.example.com/index.m3u8")]);
        assert_eq!(
            video.playback(0, 1).map(|p| p.name.as_str()),
            Some("SD")
        );
        assert!(video.playback(2, 0).is_none());
    }

    #[test]
    fn aliases_are_split_and_trimmed() {
        let resp: DetailResponse = serde_json::from_str(DETAIL).unwrap();
        let video = resp.data.unwrap();
        assert_eq!(video.aliases(), vec!["Interstellar", "星际启示录"]);
        assert!(Video::default().aliases().is_empty());
    }

    #[test]
    fn category_tree_and_unique_children() {
        let json = r#"{"Data":[{"Id":1,"Name":"类型","ParentId":0,"Type":1,
            "SonCategory":[{"Id":10,"Name":"动作","SonCategory":null},
                           {"Id":11,"Name":"喜剧"},
                           {"Id":10,"Name":"动作"}]}]}"#;
        let resp: DataResponse<Vec<Category>> = serde_json::from_str(json).unwrap();
        let top = &resp.data[0];
        assert_eq!(top.kind, Some(1));
        let ids: Vec<i64> = top.unique_children().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn list_response_with_null_data() {
        let resp: ListResponse =
            serde_json::from_str(r#"{"Data":null,"LastId":0,"Total":0}"#).unwrap();
        assert!(resp.data.is_empty());
        assert_eq!(resp.total, 0);
    }
}
