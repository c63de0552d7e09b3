pub mod adaptive;
pub mod engine;
pub mod session;
pub mod source;
pub mod stats;

pub use adaptive::{select_initial_level, AdaptiveController, AdaptivePolicy};
pub use engine::{EngineConfig, EngineError, EngineErrorKind, EngineEvent, HlsEngine, Level};
pub use session::PlaybackSelection;
pub use source::parse_playback_urls;
pub use stats::{DownloadStats, TransferStats};
