use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::catalog::types::Video;
use crate::error::Result;
use crate::storage::KeyValueStore;

/// 写入存储的播放位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPosition {
    pub group_idx: usize,
    /// 旧版本写入的是字符串
    #[serde(deserialize_with = "index_from_number_or_string")]
    pub video_idx: usize,
    pub stream_url: String,
}

fn index_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Index {
        Number(usize),
        Text(String),
    }

    match Index::deserialize(deserializer)? {
        Index::Number(n) => Ok(n),
        Index::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// 详情页当前选中的分组和播放源
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSelection {
    pub group_idx: usize,
    pub video_idx: usize,
    pub stream_url: String,
}

impl PlaybackSelection {
    pub fn storage_key(video_id: i64) -> String {
        format!("video:play:{}", video_id)
    }

    /// 第一个分组的第一个播放源，没有时退回到 `video.url`
    pub fn initial(video: &Video) -> Self {
        let stream_url = video
            .playback(0, 0)
            .map(|p| p.url.clone())
            .unwrap_or_else(|| video.url.clone());
        Self {
            group_idx: 0,
            video_idx: 0,
            stream_url,
        }
    }

    /// 恢复上次的位置。只有保存的地址与该位置当前的地址完全一致时才采用，
    /// 否则（数据已变化、记录损坏、读取失败）使用初始位置。
    pub fn restore(video: &Video, store: &dyn KeyValueStore) -> Self {
        let key = Self::storage_key(video.id);
        let raw = match store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::initial(video),
            Err(e) => {
                warn!("Failed to read playback position {}: {}", key, e);
                return Self::initial(video);
            }
        };

        let saved: SavedPosition = match serde_json::from_str(&raw) {
            Ok(saved) => saved,
            Err(e) => {
                debug!("Ignoring malformed playback position {}: {}", key, e);
                return Self::initial(video);
            }
        };

        match video.playback(saved.group_idx, saved.video_idx) {
            Some(item) if item.url == saved.stream_url => {
                debug!(
                    "Restored playback position {}/{} for video {}",
                    saved.group_idx, saved.video_idx, video.id
                );
                Self {
                    group_idx: saved.group_idx,
                    video_idx: saved.video_idx,
                    stream_url: saved.stream_url,
                }
            }
            _ => Self::initial(video),
        }
    }

    /// 选择指定分组里的播放源，越界时不做任何改变
    pub fn select(&mut self, video: &Video, group_idx: usize, video_idx: usize) -> bool {
        let Some(item) = video.playback(group_idx, video_idx) else {
            return false;
        };
        self.group_idx = group_idx;
        self.video_idx = video_idx;
        self.stream_url = item.url.clone();
        true
    }

    /// 切换分组并保证当前播放源属于该分组
    pub fn switch_group(&mut self, video: &Video, group_idx: usize) -> bool {
        if video.group(group_idx).is_none() {
            return false;
        }
        self.group_idx = group_idx;
        self.ensure_valid(video);
        true
    }

    /// 当前地址与分组内对应位置不一致时，回到该分组的第一个播放源。
    /// 分组为空时保持不变。
    pub fn ensure_valid(&mut self, video: &Video) {
        let Some(group) = video.group(self.group_idx) else {
            return;
        };
        let Some(first) = group.playback_urls.first() else {
            return;
        };

        let valid = group
            .playback_urls
            .get(self.video_idx)
            .map(|item| item.url == self.stream_url)
            .unwrap_or(false);
        if !valid {
            self.video_idx = 0;
            self.stream_url = first.url.clone();
        }
    }

    pub fn persist(&self, video_id: i64, store: &dyn KeyValueStore) -> Result<()> {
        let saved = SavedPosition {
            group_idx: self.group_idx,
            video_idx: self.video_idx,
            stream_url: self.stream_url.clone(),
        };
        store.set(&Self::storage_key(video_id), &serde_json::to_string(&saved)?)
    }
}
