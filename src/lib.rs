pub mod catalog;
pub mod config;
pub mod error;
pub mod i18n;
pub mod logger;
pub mod network;
pub mod playback;
pub mod plugin;
pub mod plugin_manager;
pub mod plugins;
pub mod proxy;
pub mod seo;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{Result, StreamError};
pub use plugin_manager::PluginManager;

pub mod prelude {
    pub use crate::catalog::{ApiClient, CategoryFilter, InfiniteFeed, ListQuery, Video};
    pub use crate::config::Config;
    pub use crate::error::{Result, StreamError};
    pub use crate::i18n::{Language, LanguageSettings, TranslationKey};
    pub use crate::playback::{AdaptiveController, AdaptivePolicy, PlaybackSelection};
    pub use crate::plugin::Plugin;
    pub use crate::plugin_manager::PluginManager;
    pub use crate::plugins::HlsProxyPlugin;
    pub use crate::proxy::{ProxyServer, RouteHandler};
    pub use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore};
}
