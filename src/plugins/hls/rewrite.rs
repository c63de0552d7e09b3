//! m3u8 地址重写：把清单里引用的所有地址改为指回代理路由。

use url::Url;

use crate::utils::resolve_url;

const URI_ATTRIBUTE: &str = "URI=\"";

/// `{route}?url=<percent-encoded absolute url>`
pub fn proxied_url(route: &str, absolute: &str) -> String {
    format!("{}?url={}", route, urlencoding::encode(absolute))
}

/// 按响应类型或地址后缀判断是否是 HLS 清单
pub fn is_manifest(content_type: &str, url: &Url) -> bool {
    content_type.to_ascii_lowercase().contains("mpegurl")
        || url.path().to_ascii_lowercase().ends_with(".m3u8")
}

/// 重写清单文本。
///
/// 非空且不以 `#` 开头的行视为地址，相对 `base` 解析后替换为代理地址；
/// 标签行中的 `URI="..."` 属性（密钥、音轨、I 帧流等）同样处理。
/// 无法解析的地址保持原样。
pub fn rewrite_manifest(text: &str, base: &Url, route: &str) -> String {
    text.split('\n')
        .map(|line| rewrite_line(line, base, route))
        .collect::<Vec<_>>()
        .join("\n")
}

fn rewrite_line(line: &str, base: &Url, route: &str) -> String {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return line.to_string();
    }
    if line.starts_with('#') {
        return rewrite_uri_attributes(line, base, route);
    }
    match resolve_url(base, trimmed) {
        Some(absolute) => proxied_url(route, &absolute),
        None => line.to_string(),
    }
}

fn rewrite_uri_attributes(line: &str, base: &Url, route: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find(URI_ATTRIBUTE) {
        let value_start = start + URI_ATTRIBUTE.len();
        let Some(len) = rest[value_start..].find('"') else {
            break;
        };
        let value = &rest[value_start..value_start + len];

        out.push_str(&rest[..value_start]);
        match resolve_url(base, value) {
            Some(absolute) if !value.is_empty() => out.push_str(&proxied_url(route, &absolute)),
            _ => out.push_str(value),
        }
        out.push('"');
        rest = &rest[value_start + len + 1..];
    }

    out.push_str(rest);
    out
}
