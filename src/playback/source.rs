//! 播放源字符串解析。
//!
//! 采集站返回的地址格式为 `线路$$$名称$地址#名称$地址`：`$$$` 分隔多段，
//! 只取最后一段；`#` 分隔条目；每个条目按 `$` 切分，前两段分别是名称和地址。

use crate::catalog::types::PlaybackUrl;

const SECTION_DELIMITER: &str = "$$$";
const ENTRY_DELIMITER: char = '#';
const NAME_DELIMITER: char = '$';
const MANIFEST_SUFFIX: &str = ".m3u8";

/// 解析播放源，丢弃格式不完整或不是 m3u8 的条目
pub fn parse_playback_urls(input: &str) -> Vec<PlaybackUrl> {
    let section = input.rsplit(SECTION_DELIMITER).next().unwrap_or_default();
    if section.is_empty() {
        return Vec::new();
    }

    section
        .split(ENTRY_DELIMITER)
        .filter_map(parse_entry)
        .filter(|entry| entry.url.ends_with(MANIFEST_SUFFIX))
        .collect()
}

fn parse_entry(entry: &str) -> Option<PlaybackUrl> {
    let mut parts = entry.split(NAME_DELIMITER);
    let (name, url) = (parts.next()?.trim(), parts.next()?.trim());
    if name.is_empty() || url.is_empty() {
        return None;
    }
    Some(PlaybackUrl::new(name, url))
}
