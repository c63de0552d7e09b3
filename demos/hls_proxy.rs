use std::net::SocketAddr;
use std::sync::Arc;

use hyper::Client;
use tokio::sync::oneshot;
use tracing::{error, info};
use vod_gateway::logger::init_logger;
use vod_gateway::catalog::VideoUrl;
use vod_gateway::playback::{parse_playback_urls, EngineConfig};
use vod_gateway::plugins::hls::rewrite::proxied_url;
use vod_gateway::prelude::*;
use vod_gateway::seo::PageMetadata;

// 采集站格式的播放源
const PLAYBACK_SOURCE: &str = "线路A$$$正片$https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8\
                               #预告$https://example.com/trailer.mp4";

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logger();
    info!("Starting HLS proxy demo");

    let entries = parse_playback_urls(PLAYBACK_SOURCE);
    for entry in &entries {
        info!("Playback entry {} -> {}", entry.name, entry.url);
    }
    let Some(stream) = entries.first() else {
        error!("No playable entries");
        return Ok(());
    };

    let engine_config = serde_json::to_string_pretty(&EngineConfig::for_stream(&stream.url))?;
    info!("Engine config:\n{}", engine_config);

    let config = Config::load()?;
    restore_client_state(&config, &entries)?;

    let mut server = ProxyServer::new(SocketAddr::from(([127, 0, 0, 1], 0)));
    server.add_handler(Arc::new(HlsProxyPlugin::new(&config.proxy)));

    let (tx, rx) = oneshot::channel::<()>();
    let (addr, handle) = server.start(async {
        let _ = rx.await;
    })?;

    let uri = format!("http://{}{}", addr, proxied_url(&config.proxy.route, &stream.url));
    info!("Requesting {}", uri);
    let resp = Client::new().get(uri.parse()?).await?;
    info!("Proxy responded with {}", resp.status());

    let body = hyper::body::to_bytes(resp.into_body()).await?;
    for line in String::from_utf8_lossy(&body).lines().take(12) {
        info!("  {}", line);
    }

    let _ = tx.send(());
    handle.await??;
    info!("Demo finished");
    Ok(())
}

/// 客户端状态：语言、播放位置和详情页元数据
fn restore_client_state(config: &Config, entries: &[vod_gateway::catalog::PlaybackUrl]) -> Result<()> {
    let store = Arc::new(JsonFileStore::open(&config.storage.state_file)?);
    info!("Client state stored in {:?}", store.path());

    let settings = LanguageSettings::load(store.clone());
    info!("Language {} ({})", settings.language(), settings.t(TranslationKey::Quality));

    let video = Video {
        id: 1,
        title: "测试流".into(),
        video_url_arr: vec![VideoUrl {
            playback_urls: entries.to_vec(),
            ..Default::default()
        }],
        ..Default::default()
    };
    let selection = PlaybackSelection::restore(&video, &store);
    info!(
        "Playing group {} entry {}: {}",
        selection.group_idx, selection.video_idx, selection.stream_url
    );
    selection.persist(video.id, &store)?;

    let policy = AdaptivePolicy::from(&config.playback);
    info!("Adaptive policy: {:?}", policy);
    info!("Page title: {}", PageMetadata::for_video(&video).title);
    Ok(())
}
