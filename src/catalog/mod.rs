pub mod client;
pub mod feed;
pub mod filter;
pub mod pagination;
pub mod types;

pub use client::ApiClient;
pub use feed::{InfiniteFeed, ListQuery, VideoSource};
pub use filter::{CategoryFilter, RowCollapse, Selection};
pub use pagination::{pagination_range, PageItem};
pub use types::{Category, PlaybackUrl, Video, VideoClass, VideoUrl};
