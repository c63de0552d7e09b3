use m3u8_rs::Playlist;
use serde::Serialize;

use crate::error::{Result, StreamError};

/// 一个可切换的码率档位
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Level {
    pub height: u64,
    pub bitrate: u64,
    pub uri: String,
}

impl Level {
    pub fn new(height: u64, bitrate: u64) -> Self {
        Self {
            height,
            bitrate,
            uri: String::new(),
        }
    }
}

/// 从 m3u8 内容中得到档位列表。
///
/// 主播放列表按变体流顺序返回（跳过 I 帧流）；媒体播放列表只有一个档位。
pub fn levels_from_playlist(content: &[u8]) -> Result<Vec<Level>> {
    let playlist = m3u8_rs::parse_playlist_res(content)
        .map_err(|e| StreamError::Parse(format!("Failed to parse m3u8: {:?}", e)))?;

    Ok(match playlist {
        Playlist::MasterPlaylist(master) => master
            .variants
            .into_iter()
            .filter(|variant| !variant.is_i_frame)
            .map(|variant| Level {
                height: variant.resolution.map(|r| r.height).unwrap_or(0),
                bitrate: variant.bandwidth,
                uri: variant.uri,
            })
            .collect(),
        Playlist::MediaPlaylist(_) => vec![Level::default()],
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Network,
    Media,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub fatal: bool,
    pub kind: EngineErrorKind,
    pub details: String,
}

impl EngineError {
    pub fn fatal(kind: EngineErrorKind, details: impl Into<String>) -> Self {
        Self {
            fatal: true,
            kind,
            details: details.into(),
        }
    }

    pub fn recoverable(kind: EngineErrorKind, details: impl Into<String>) -> Self {
        Self {
            fatal: false,
            kind,
            details: details.into(),
        }
    }
}

/// 播放引擎的生命周期事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ManifestParsed,
    Error(EngineError),
    Destroying,
}

/// 媒体元素上表示缓冲不足的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    Stalled,
    Waiting,
    Suspend,
}

/// HLS 播放引擎（外部实现，这里只做配置和监听）
pub trait HlsEngine: Send {
    fn levels(&self) -> &[Level];

    /// 当前档位，自动码率且尚未选定时为 None
    fn current_level(&self) -> Option<usize>;

    fn set_current_level(&mut self, level: usize);

    fn set_auto_level_enabled(&mut self, enabled: bool);

    fn start_load(&mut self) -> Result<()>;

    fn stop_load(&mut self) -> Result<()>;

    fn recover_media_error(&mut self) -> Result<()>;
}

pub trait MediaElement: Send {
    fn paused(&self) -> bool;

    fn ended(&self) -> bool;

    fn play(&mut self) -> Result<()>;
}

/// 挂到播放引擎上的配置，序列化后与引擎的配置字段一致
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub start_level: i32,
    pub auto_start_load: bool,
    pub low_latency_mode: bool,
    /// 不按播放器尺寸限制档位，保证能到最高清晰度
    pub cap_level_to_player_size: bool,
    pub max_buffer_length: u32,
    pub back_buffer_length: u32,
    pub max_buffer_hole: f64,
    pub abr_ewma_default_estimate: u64,
    pub abr_band_width_factor: f64,
    #[serde(rename = "manifestLoadingTimeOut")]
    pub manifest_loading_timeout_ms: u64,
    #[serde(rename = "fragLoadingTimeOut")]
    pub frag_loading_timeout_ms: u64,
    pub p2p: P2pConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct P2pConfig {
    pub core: P2pCoreConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct P2pCoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swarm_id: Option<String>,
}

impl EngineConfig {
    /// 以播放地址作为 P2P swarm id
    pub fn for_stream(stream_url: &str) -> Self {
        let swarm_id = Some(stream_url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Self {
            start_level: -1,
            auto_start_load: true,
            low_latency_mode: false,
            cap_level_to_player_size: false,
            max_buffer_length: 25,
            back_buffer_length: 30,
            max_buffer_hole: 0.5,
            abr_ewma_default_estimate: 500_000,
            abr_band_width_factor: 0.8,
            manifest_loading_timeout_ms: 20_000,
            frag_loading_timeout_ms: 20_000,
            p2p: P2pConfig {
                core: P2pCoreConfig { swarm_id },
            },
        }
    }
}
