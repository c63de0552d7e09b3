use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::engine::{
    EngineError, EngineErrorKind, EngineEvent, HlsEngine, Level, MediaElement, MediaEvent,
};
use super::stats::{DownloadSource, P2pEvent, PeerDetails, TransferStats};
use crate::config::PlaybackConfig;

#[derive(Debug, Clone)]
pub struct AdaptivePolicy {
    /// 两次降级之间的最小间隔
    pub downgrade_cooldown: Duration,
    /// 持续无卡顿多久后恢复到最高档
    pub recover_after: Duration,
    pub check_interval: Duration,
}

impl Default for AdaptivePolicy {
    fn default() -> Self {
        Self {
            downgrade_cooldown: Duration::from_secs(8),
            recover_after: Duration::from_secs(30),
            check_interval: Duration::from_secs(5),
        }
    }
}

impl From<&PlaybackConfig> for AdaptivePolicy {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            downgrade_cooldown: config.downgrade_cooldown(),
            recover_after: config.recover_after(),
            check_interval: config.check_interval(),
        }
    }
}

/// 起播档位：最高分辨率优先；分辨率都未知时取最高码率。
/// 比较用严格大于，相同时保留先出现的档位。
pub fn select_initial_level(levels: &[Level]) -> Option<usize> {
    if levels.is_empty() {
        return None;
    }

    let mut best = 0;
    for (idx, level) in levels.iter().enumerate().skip(1) {
        if level.height > levels[best].height {
            best = idx;
        }
    }

    if levels[best].height == 0 {
        best = 0;
        for (idx, level) in levels.iter().enumerate().skip(1) {
            if level.bitrate > levels[best].bitrate {
                best = idx;
            }
        }
    }

    Some(best)
}

struct Session<E, M> {
    engine: E,
    media: Option<M>,
    last_stall_at: Option<Instant>,
    cooldown_until: Option<Instant>,
}

impl<E: HlsEngine, M: MediaElement> Session<E, M> {
    fn max_level(&self) -> Option<usize> {
        self.engine.levels().len().checked_sub(1)
    }

    fn mark_stall(&mut self, now: Instant) {
        self.last_stall_at = Some(now);
    }

    fn try_downgrade(&mut self, policy: &AdaptivePolicy, now: Instant) {
        if let Some(until) = self.cooldown_until {
            if now < until {
                debug!("Downgrade skipped, cooling down for {:?}", until - now);
                return;
            }
        }

        match self.engine.current_level() {
            Some(current) if current > 0 => {
                info!("Downgrading quality level {} -> {}", current, current - 1);
                self.engine.set_current_level(current - 1);
                self.cooldown_until = Some(now + policy.downgrade_cooldown);
            }
            _ => debug!("Already at the lowest level, nothing to downgrade"),
        }
    }

    fn try_upgrade_to_max(&mut self) {
        let Some(max) = self.max_level() else {
            return;
        };
        if self.engine.current_level() != Some(max) {
            info!("Playback stable, restoring quality level {}", max);
            self.engine.set_current_level(max);
        }
    }

    fn is_playing(&self) -> bool {
        self.media
            .as_ref()
            .map(|media| !media.ended() && !media.paused())
            .unwrap_or(false)
    }

    /// 从未卡顿过也视为稳定
    fn check_stability(&mut self, policy: &AdaptivePolicy, now: Instant) {
        if !self.is_playing() {
            return;
        }
        let stable = self
            .last_stall_at
            .map(|at| now.duration_since(at) > policy.recover_after)
            .unwrap_or(true);
        if stable {
            self.try_upgrade_to_max();
        }
    }
}

/// 自适应播放控制：起播选档、错误恢复、卡顿降级、稳定后恢复最高档。
///
/// 所有恢复动作都是尽力而为，失败只记日志，不会向调用方抛出。
pub struct AdaptiveController<E, M> {
    session: Arc<Mutex<Session<E, M>>>,
    policy: AdaptivePolicy,
    stats: Arc<TransferStats>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl<E, M> AdaptiveController<E, M>
where
    E: HlsEngine + 'static,
    M: MediaElement + 'static,
{
    pub fn new(engine: E, media: Option<M>, policy: AdaptivePolicy) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session {
                engine,
                media,
                last_stall_at: None,
                cooldown_until: None,
            })),
            policy,
            stats: Arc::new(TransferStats::new()),
            ticker: Mutex::new(None),
        }
    }

    pub fn stats(&self) -> Arc<TransferStats> {
        self.stats.clone()
    }

    pub fn policy(&self) -> &AdaptivePolicy {
        &self.policy
    }

    pub fn current_level(&self) -> Option<usize> {
        self.session.lock().engine.current_level()
    }

    pub fn with_engine<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&self.session.lock().engine)
    }

    pub fn on_engine_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::ManifestParsed => self.on_manifest_parsed(),
            EngineEvent::Error(error) => self.on_engine_error(error),
            EngineEvent::Destroying => self.shutdown(),
        }
    }

    /// 选定起播档位并关闭自动码率，之后的切换全部由本控制器负责
    pub fn on_manifest_parsed(&self) {
        let mut session = self.session.lock();
        let Some(best) = select_initial_level(session.engine.levels()) else {
            debug!("Manifest parsed without levels");
            return;
        };
        info!(
            "Manifest parsed with {} levels, starting at level {}",
            session.engine.levels().len(),
            best
        );
        session.engine.set_auto_level_enabled(false);
        session.engine.set_current_level(best);
    }

    pub fn on_engine_error(&self, error: &EngineError) {
        if !error.fatal {
            return;
        }

        warn!("Fatal {:?} error from engine: {}", error.kind, error.details);
        let now = Instant::now();
        let mut session = self.session.lock();

        let recovered = match error.kind {
            // 重新加载，保留当前位置
            EngineErrorKind::Network => session.engine.start_load(),
            EngineErrorKind::Media => session.engine.recover_media_error(),
            EngineErrorKind::Other => {
                let engine = &mut session.engine;
                engine.stop_load().and_then(|_| engine.start_load())
            }
        };
        if let Err(e) = recovered {
            warn!("Recovery after {:?} error failed: {}", error.kind, e);
        }

        session.mark_stall(now);
        session.try_downgrade(&self.policy, now);
    }

    pub fn on_media_event(&self, event: MediaEvent) {
        debug!("Media event: {:?}", event);
        let now = Instant::now();
        let mut session = self.session.lock();

        if let Some(media) = session.media.as_mut() {
            if media.paused() && !media.ended() {
                if let Err(e) = media.play() {
                    debug!("Resume after {:?} failed: {}", event, e);
                }
            }
        }

        session.mark_stall(now);
        session.try_downgrade(&self.policy, now);
    }

    pub fn on_p2p_event(&self, event: &P2pEvent) {
        self.stats.record(event);
    }

    pub fn on_peer_connect(&self, peer: PeerDetails) {
        self.stats.record(&P2pEvent::PeerConnect(peer));
    }

    pub fn on_peer_close(&self, peer: PeerDetails) {
        self.stats.record(&P2pEvent::PeerClose(peer));
    }

    pub fn on_chunk_downloaded(&self, bytes: u64, source: DownloadSource) {
        self.stats.record(&P2pEvent::ChunkDownloaded { bytes, source });
    }

    pub fn on_chunk_uploaded(&self, bytes: u64) {
        self.stats.record(&P2pEvent::ChunkUploaded { bytes });
    }

    /// 周期检查：播放中且长时间无卡顿时恢复到最高档
    pub fn tick(&self) {
        self.session
            .lock()
            .check_stability(&self.policy, Instant::now());
    }

    /// 启动周期检查任务，引擎销毁或控制器释放时停止
    pub fn spawn_health_check(&self) {
        let mut ticker = self.ticker.lock();
        if ticker.is_some() || self.session.lock().media.is_none() {
            return;
        }

        let period = self.policy.check_interval;
        if period.is_zero() {
            warn!("Playback health check disabled, check interval is zero");
            return;
        }

        let session = Arc::downgrade(&self.session);
        let policy = self.policy.clone();

        *ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let Some(state) = session.upgrade() else {
                    break;
                };
                state.lock().check_stability(&policy, Instant::now());
            }
        }));
        debug!("Playback health check started, interval {:?}", period);
    }

    pub fn shutdown(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
            debug!("Playback health check stopped");
        }
    }

    pub fn is_checking(&self) -> bool {
        self.ticker.lock().is_some()
    }
}

impl<E, M> Drop for AdaptiveController<E, M> {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}
