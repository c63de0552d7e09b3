use tracing::info;
use tracing_subscriber::EnvFilter;

pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vod_gateway=info,request=info"));

    // 重复初始化（例如在测试里）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(true)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

pub fn log_request(method: &str, path: &str, status: u16, duration: std::time::Duration) {
    info!(
        target: "request",
        method = %method,
        path = %path,
        status = status,
        duration_ms = %duration.as_millis(),
        "Request completed"
    );
}
