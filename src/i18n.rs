use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{Result, StreamError};
use crate::storage::KeyValueStore;

pub const LANGUAGE_KEY: &str = "app-language";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    ZhCn,
    EnUs,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::ZhCn, Language::EnUs];

    pub fn code(self) -> &'static str {
        match self {
            Language::ZhCn => "zh-CN",
            Language::EnUs => "en-US",
        }
    }

    /// 语言选择菜单里显示的名字
    pub fn display_name(self) -> &'static str {
        match self {
            Language::ZhCn => "中文",
            Language::EnUs => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zh-CN" => Ok(Language::ZhCn),
            "en-US" => Ok(Language::EnUs),
            other => Err(StreamError::InvalidInput(format!("unsupported language {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslationKey {
    Home,
    Loading,
    Source,
    Quality,
    ShowPlayer,
    VideoTitleSuffix,
    VideoDescDefault,
    CategoryLoading,
    Search,
    SearchPlaceholder,
    All,
    Collapse,
    ShowMore,
}

impl TranslationKey {
    pub const ALL: [TranslationKey; 13] = [
        TranslationKey::Home,
        TranslationKey::Loading,
        TranslationKey::Source,
        TranslationKey::Quality,
        TranslationKey::ShowPlayer,
        TranslationKey::VideoTitleSuffix,
        TranslationKey::VideoDescDefault,
        TranslationKey::CategoryLoading,
        TranslationKey::Search,
        TranslationKey::SearchPlaceholder,
        TranslationKey::All,
        TranslationKey::Collapse,
        TranslationKey::ShowMore,
    ];
}

fn zh_cn(key: TranslationKey) -> &'static str {
    use TranslationKey::*;
    match key {
        Home => "首页",
        Loading => "加载中...",
        Source => "源",
        Quality => "清晰度",
        ShowPlayer => "显示播放入口",
        VideoTitleSuffix => " - 7x影视",
        VideoDescDefault => "分享好看的4k影视,在线观看,超清视频,高清视频",
        CategoryLoading => "加载视频分类失败",
        Search => "搜索",
        SearchPlaceholder => "搜索...",
        All => "全部",
        Collapse => "收起",
        ShowMore => "显示更多",
    }
}

fn en_us(key: TranslationKey) -> &'static str {
    use TranslationKey::*;
    match key {
        Home => "Home",
        Loading => "Loading...",
        Source => "Source",
        Quality => "Quality",
        ShowPlayer => "Show Player",
        VideoTitleSuffix => " - 7x Movies",
        VideoDescDefault => {
            "Share good 4k movies, watch online, ultra-clear video, high-definition video"
        }
        CategoryLoading => "Failed to load video categories",
        Search => "Search",
        SearchPlaceholder => "Search...",
        All => "All",
        Collapse => "Collapse",
        ShowMore => "Show More",
    }
}

/// 查找翻译。两张表都按 `TranslationKey` 穷尽匹配，新增的键必须同时给出中英文。
pub fn translate(lang: Language, key: TranslationKey) -> &'static str {
    match lang {
        Language::ZhCn => zh_cn(key),
        Language::EnUs => en_us(key),
    }
}

/// 当前界面语言，变更时写入存储
pub struct LanguageSettings<S> {
    current: RwLock<Language>,
    store: S,
}

impl<S: KeyValueStore> LanguageSettings<S> {
    /// 读取保存的语言，无效值或读取失败时使用中文
    pub fn load(store: S) -> Self {
        let current = match store.get(LANGUAGE_KEY) {
            Ok(Some(code)) => code.parse().unwrap_or_else(|_| {
                debug!("Ignoring saved language {:?}", code);
                Language::default()
            }),
            Ok(None) => Language::default(),
            Err(e) => {
                warn!("Failed to read language setting: {}", e);
                Language::default()
            }
        };
        Self {
            current: RwLock::new(current),
            store,
        }
    }

    pub fn language(&self) -> Language {
        *self.current.read()
    }

    pub fn set_language(&self, lang: Language) -> Result<()> {
        *self.current.write() = lang;
        self.store.set(LANGUAGE_KEY, lang.code())
    }

    pub fn t(&self, key: TranslationKey) -> &'static str {
        translate(self.language(), key)
    }
}
