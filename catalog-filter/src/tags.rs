use std::collections::BTreeMap;

use catalog_common::Post;

/// 标签索引 - 数据集中所有去重后的标签，按字典序排列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    counts: BTreeMap<String, usize>,
    sorted: Vec<String>,
}

impl TagIndex {
    /// 从文章列表构建索引，同一文章内重复的标签只计一次
    pub fn build(posts: &[Post]) -> Self {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();

        for post in posts {
            let mut seen: Vec<&str> = Vec::with_capacity(post.tags.len());
            for tag in &post.tags {
                let tag = tag.trim();
                if tag.is_empty() || seen.contains(&tag) {
                    continue;
                }
                seen.push(tag);
                *counts.entry(tag.to_string()).or_default() += 1;
            }
        }

        let sorted = counts.keys().cloned().collect();
        Self { counts, sorted }
    }

    /// 排序后的标签列表
    pub fn tags(&self) -> &[String] {
        &self.sorted
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.counts.contains_key(tag)
    }

    /// 带有该标签的文章数量
    pub fn count(&self, tag: &str) -> usize {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    /// 按文章数量降序排列（数量相同时按字典序）
    pub fn by_frequency(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> =
            self.counts.iter().map(|(tag, &n)| (tag.as_str(), n)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}
