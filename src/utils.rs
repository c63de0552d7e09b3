use hyper::{Body, Request};
use url::Url;

/// 从请求中读取指定的查询参数（已解码）
pub fn query_param(req: &Request<Body>, name: &str) -> Option<String> {
    let query = req.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// 检查URL是否为绝对的 http(s) URL
pub fn is_absolute_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 解析并校验一个 http(s) 绝对地址
pub fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Some(url),
        _ => None,
    }
}

/// 将相对URL转换为绝对URL，无法解析时返回 None
///
/// # Examples
/// ```
/// use url::Url;
/// use vod_gateway::utils::resolve_url;
///
/// let base = Url::parse("http://example.com/video/index.m3u8").unwrap();
/// assert_eq!(
///     resolve_url(&base, "segment.ts").as_deref(),
///     Some("http://example.com/video/segment.ts")
/// );
/// ```
pub fn resolve_url(base: &Url, relative: &str) -> Option<String> {
    if is_absolute_url(relative) {
        return Some(relative.to_string());
    }
    base.join(relative).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_decodes() {
        let req = Request::builder()
            .uri("/api/proxy?foo=1&url=https%3A%2F%2Fcdn.example.com%2Fa.m3u8")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            query_param(&req, "url").as_deref(),
            Some("https://cdn.example.com/a.m3u8")
        );
        assert_eq!(query_param(&req, "missing"), None);
    }

    #[test]
    fn test_is_absolute_url() {
        assert!(is_absolute_url("http://example.com"));
        assert!(is_absolute_url("https://example.com"));
        assert!(!is_absolute_url("relative/path"));
        assert!(!is_absolute_url("/absolute/path"));
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://cdn.example.com/x.m3u8").is_some());
        assert!(parse_http_url("ftp://cdn.example.com/x").is_none());
        assert!(parse_http_url("not a url").is_none());
    }

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("http://example.com/video/").unwrap();
        assert_eq!(
            resolve_url(&base, "segment.ts").as_deref(),
            Some("http://example.com/video/segment.ts")
        );
        assert_eq!(
            resolve_url(&base, "http://other.com/file.ts").as_deref(),
            Some("http://other.com/file.ts")
        );

        let base = Url::parse("http://example.com/video/playlist.m3u8").unwrap();
        assert_eq!(
            resolve_url(&base, "../segments/segment.ts").as_deref(),
            Some("http://example.com/segments/segment.ts")
        );
        assert_eq!(
            resolve_url(&base, "/root.ts").as_deref(),
            Some("http://example.com/root.ts")
        );
    }
}
