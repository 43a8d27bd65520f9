use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 缺少标题时使用的默认标题
pub const UNTITLED: &str = "Untitled";

/// 默认占位缩略图
pub const DEFAULT_PLACEHOLDER: &str = "assets/placeholder.png";

/// 博文 - 目录中的一条记录，加载后不再修改
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Post {
    /// 文章外部链接
    pub url: String,
    /// 文章标题（参与搜索）
    pub title: String,
    /// 缩略图地址，缺失时为占位图
    pub thumbnail: String,
    /// 规范化后的标签列表（已去除首尾空白，且无空标签）
    pub tags: Vec<String>,
}

impl Post {
    /// 判断文章是否带有指定标签（精确匹配）
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// 原始博文记录 - 与 blogs.json 中的字段一一对应，所有字段都允许缺失
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct RawPost {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<Option<String>>>,
}

impl RawPost {
    /// 转换为规范化的博文，缺失字段使用默认值
    pub fn into_post(self, placeholder: &str) -> Post {
        let title = non_blank(self.title).unwrap_or_else(|| UNTITLED.to_string());
        let thumbnail = non_blank(self.thumbnail).unwrap_or_else(|| placeholder.to_string());
        let tags = self
            .tags
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|tag| normalize_tag(&tag))
            .collect();

        Post {
            url: self.url.map(|u| u.trim().to_string()).unwrap_or_default(),
            title,
            thumbnail,
            tags,
        }
    }

    /// 原始记录中是否显式给出了缩略图
    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// 规范化标签：去除首尾空白，空标签返回 None
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 快照元数据 - 描述一次目录快照的基本信息
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SnapshotMetadata {
    /// 快照中的文章数量
    pub post_count: usize,
    /// 去重后的标签数量
    pub tag_count: usize,
    /// 快照生成时间
    pub created_at: DateTime<Utc>,
    /// 生成工具版本
    pub version: String,
}

/// 目录快照 - 规范化后的文章列表及其元数据
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogSnapshot {
    pub metadata: SnapshotMetadata,
    pub posts: Vec<Post>,
}
