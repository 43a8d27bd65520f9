/// 分页结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a, T> {
    /// 修正到合法范围后的页码（从 1 开始）
    pub page: usize,
    /// 本页条目
    pub items: &'a [T],
    /// 总页数，至少为 1
    pub total_pages: usize,
}

/// 计算总页数：`max(1, ceil(len / page_size))`
pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1)).max(1)
}

/// 将请求的页码修正到 `[1, total_pages]`
pub fn clamp_page(requested: i64, total_pages: usize) -> usize {
    if requested < 1 {
        return 1;
    }
    usize::try_from(requested)
        .unwrap_or(usize::MAX)
        .min(total_pages.max(1))
}

/// 对列表分页；页码越界时静默修正，空列表返回空切片
pub fn paginate<T>(items: &[T], page_size: usize, requested_page: i64) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let total_pages = total_pages(items.len(), page_size);
    let page = clamp_page(requested_page, total_pages);

    let start = ((page - 1) * page_size).min(items.len());
    let end = (start + page_size).min(items.len());

    Page {
        page,
        items: &items[start..end],
        total_pages,
    }
}

impl<T> Page<'_, T> {
    /// 本页条目在整个列表中的位置（从 1 开始，闭区间），空页返回 None
    pub fn range(&self, page_size: usize) -> Option<(usize, usize)> {
        if self.items.is_empty() {
            return None;
        }
        let start = (self.page - 1) * page_size.max(1) + 1;
        Some((start, start + self.items.len() - 1))
    }
}
