use std::fmt;

/// 分页条中的一项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Dots,
}

impl fmt::Display for PageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageItem::Page(n) => write!(f, "{}", n),
            PageItem::Dots => f.write_str("..."),
        }
    }
}

fn pages(start: u32, end: u32) -> impl Iterator<Item = PageItem> {
    (start..=end).map(PageItem::Page)
}

/// 生成分页条。
///
/// 页数不多时列出全部页码；否则保留首尾页、当前页及两侧 `sibling_count`
/// 个页码，中间用省略号代替：
///
/// ```
/// use vod_gateway::catalog::pagination::{pagination_range, PageItem};
///
/// let items: Vec<String> = pagination_range(500, 10, 1, 25)
///     .iter()
///     .map(PageItem::to_string)
///     .collect();
/// assert_eq!(items.join(" "), "1 ... 24 25 26 ... 50");
/// ```
pub fn pagination_range(
    total: u64,
    page_size: u32,
    sibling_count: u32,
    current_page: u32,
) -> Vec<PageItem> {
    if page_size == 0 {
        return Vec::new();
    }
    let page_count = u32::try_from(total.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX);

    // 首尾页 + 当前页 + 两个省略号
    let slots = sibling_count.saturating_add(5);
    if slots >= page_count {
        return pages(1, page_count).collect();
    }

    let left_sibling = current_page.saturating_sub(sibling_count).max(1);
    let right_sibling = current_page.saturating_add(sibling_count).min(page_count);

    let left_dots = left_sibling > 2;
    let right_dots = right_sibling < page_count - 2;
    let edge_count = sibling_count.saturating_mul(2).saturating_add(3);

    // 首尾块已经能覆盖全部页码时不再显示省略号
    if edge_count.saturating_add(1) >= page_count {
        return pages(1, page_count).collect();
    }

    match (left_dots, right_dots) {
        (false, true) => pages(1, edge_count)
            .chain([PageItem::Dots, PageItem::Page(page_count)])
            .collect(),
        (true, false) => [PageItem::Page(1), PageItem::Dots]
            .into_iter()
            .chain(pages(page_count - edge_count + 1, page_count))
            .collect(),
        (true, true) => [PageItem::Page(1), PageItem::Dots]
            .into_iter()
            .chain(pages(left_sibling, right_sibling))
            .chain([PageItem::Dots, PageItem::Page(page_count)])
            .collect(),
        (false, false) => pages(1, page_count).collect(),
    }
}
