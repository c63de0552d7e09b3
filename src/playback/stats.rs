use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// HTTP / P2P 流量统计，按播放会话重置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStats {
    pub http_downloaded: u64,
    pub p2p_downloaded: u64,
    pub p2p_uploaded: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadSource {
    Http,
    P2p,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Main,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerDetails {
    pub peer_id: String,
    pub stream_type: StreamType,
}

impl PeerDetails {
    pub fn main(peer_id: impl Into<String>) -> Self {
        Self {
            peer_id: peer_id.into(),
            stream_type: StreamType::Main,
        }
    }
}

/// P2P 加载器发出的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum P2pEvent {
    PeerConnect(PeerDetails),
    PeerClose(PeerDetails),
    ChunkDownloaded { bytes: u64, source: DownloadSource },
    ChunkUploaded { bytes: u64 },
}

#[derive(Debug, Default)]
pub struct TransferStats {
    http_downloaded: AtomicU64,
    p2p_downloaded: AtomicU64,
    p2p_uploaded: AtomicU64,
    peers: RwLock<Vec<String>>,
}

impl TransferStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: &P2pEvent) {
        match event {
            P2pEvent::PeerConnect(peer) => {
                // 只展示主流的连接
                if peer.stream_type != StreamType::Main {
                    return;
                }
                let mut peers = self.peers.write();
                if !peers.contains(&peer.peer_id) {
                    debug!("Peer connected: {}", peer.peer_id);
                    peers.push(peer.peer_id.clone());
                }
            }
            P2pEvent::PeerClose(peer) => {
                if peer.stream_type != StreamType::Main {
                    return;
                }
                debug!("Peer closed: {}", peer.peer_id);
                self.peers.write().retain(|id| id != &peer.peer_id);
            }
            P2pEvent::ChunkDownloaded { bytes, source } => {
                let counter = match source {
                    DownloadSource::Http => &self.http_downloaded,
                    DownloadSource::P2p => &self.p2p_downloaded,
                };
                counter.fetch_add(*bytes, Ordering::Relaxed);
            }
            P2pEvent::ChunkUploaded { bytes } => {
                self.p2p_uploaded.fetch_add(*bytes, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self) -> DownloadStats {
        DownloadStats {
            http_downloaded: self.http_downloaded.load(Ordering::Relaxed),
            p2p_downloaded: self.p2p_downloaded.load(Ordering::Relaxed),
            p2p_uploaded: self.p2p_uploaded.load(Ordering::Relaxed),
        }
    }

    pub fn peers(&self) -> Vec<String> {
        self.peers.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_bytes_by_source() {
        let stats = TransferStats::new();
        stats.record(&P2pEvent::ChunkDownloaded { bytes: 100, source: DownloadSource::Http });
        stats.record(&P2pEvent::ChunkDownloaded { bytes: 50, source: DownloadSource::P2p });
        stats.record(&P2pEvent::ChunkDownloaded { bytes: 25, source: DownloadSource::P2p });
        stats.record(&P2pEvent::ChunkUploaded { bytes: 10 });

        assert_eq!(
            stats.snapshot(),
            DownloadStats { http_downloaded: 100, p2p_downloaded: 75, p2p_uploaded: 10 }
        );
    }

    #[test]
    fn tracks_main_stream_peers_only() {
        let stats = TransferStats::new();
        stats.record(&P2pEvent::PeerConnect(PeerDetails::main("a")));
        stats.record(&P2pEvent::PeerConnect(PeerDetails::main("b")));
        stats.record(&P2pEvent::PeerConnect(PeerDetails::main("a")));
        stats.record(&P2pEvent::PeerConnect(PeerDetails {
            peer_id: "audio".into(),
            stream_type: StreamType::Secondary,
        }));
        assert_eq!(stats.peers(), vec!["a", "b"]);

        stats.record(&P2pEvent::PeerClose(PeerDetails::main("a")));
        assert_eq!(stats.peers(), vec!["b"]);
    }

    #[test]
    fn source_names_match_loader_events() {
        let source: DownloadSource = serde_json::from_str("\"p2p\"").unwrap();
        assert_eq!(source, DownloadSource::P2p);
        let peer: PeerDetails =
            serde_json::from_str(r#"{"peerId":"x","streamType":"main"}"#).unwrap();
        assert_eq!(peer, PeerDetails::main("x"));
    }
}
