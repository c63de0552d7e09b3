pub mod hls;

pub use hls::HlsProxyPlugin;
