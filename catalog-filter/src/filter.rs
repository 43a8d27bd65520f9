use std::collections::BTreeSet;

use catalog_common::Post;

/// 预处理后的搜索条件
struct Matcher<'q> {
    needle: String,
    active_tags: &'q BTreeSet<String>,
}

impl<'q> Matcher<'q> {
    fn new(query: &str, active_tags: &'q BTreeSet<String>) -> Self {
        Self {
            needle: query.trim().to_lowercase(),
            active_tags,
        }
    }

    // 标题或任一标签包含关键词（不区分大小写的子串匹配）
    fn matches_query(&self, post: &Post) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        post.title.to_lowercase().contains(&self.needle)
            || post
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&self.needle))
    }

    // 多个标签之间为“或”关系
    fn matches_tags(&self, post: &Post) -> bool {
        self.active_tags.is_empty() || post.tags.iter().any(|tag| self.active_tags.contains(tag))
    }

    fn matches(&self, post: &Post) -> bool {
        self.matches_tags(post) && self.matches_query(post)
    }
}

/// 筛选文章，返回命中文章在数据集中的下标（保持原有顺序）
pub fn filter_indices(posts: &[Post], query: &str, active_tags: &BTreeSet<String>) -> Vec<usize> {
    let matcher = Matcher::new(query, active_tags);
    posts
        .iter()
        .enumerate()
        .filter(|(_, post)| matcher.matches(post))
        .map(|(i, _)| i)
        .collect()
}

/// 筛选文章，返回命中的文章引用（保持原有顺序）
pub fn filter_posts<'a>(
    posts: &'a [Post],
    query: &str,
    active_tags: &BTreeSet<String>,
) -> Vec<&'a Post> {
    let matcher = Matcher::new(query, active_tags);
    posts.iter().filter(|post| matcher.matches(post)).collect()
}
