use catalog_common::{compression, is_snapshot, CatalogSnapshot, Post, RawPost};
use tracing::{info, warn};

use crate::error::LoadError;

/// 文章数据集 - 启动时加载一次，此后只读
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    posts: Vec<Post>,
}

impl Dataset {
    pub fn from_posts(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    /// 从 JSON 数组解析数据集，缺失字段使用默认值
    pub fn from_json_slice(data: &[u8], placeholder: &str) -> Result<Self, LoadError> {
        let raw: Vec<RawPost> = serde_json::from_slice(data)?;
        let posts = raw.into_iter().map(|r| r.into_post(placeholder)).collect();
        Ok(Self { posts })
    }

    /// 从压缩快照解析数据集
    pub fn from_snapshot(data: &[u8]) -> Result<Self, LoadError> {
        let snapshot: CatalogSnapshot = compression::from_compressed(data)?;
        Ok(Self {
            posts: snapshot.posts,
        })
    }

    /// 根据内容自动识别快照或 JSON
    pub fn from_bytes(data: &[u8], placeholder: &str) -> Result<Self, LoadError> {
        if is_snapshot(data) {
            Self::from_snapshot(data)
        } else {
            Self::from_json_slice(data, placeholder)
        }
    }

    /// 处理一次 HTTP 响应：非 2xx 状态视为失败，与成功但为空的结果区分开
    pub fn from_response(status: u16, body: &[u8], placeholder: &str) -> Result<Self, LoadError> {
        if !(200..300).contains(&status) {
            warn!(status, "数据请求返回非成功状态");
            return Err(LoadError::Status(status));
        }

        let dataset = Self::from_bytes(body, placeholder)?;
        info!(posts = dataset.len(), "数据集加载完成");
        Ok(dataset)
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn get(&self, index: usize) -> Option<&Post> {
        self.posts.get(index)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// 为数据地址追加缓存破坏参数 `v`，保留原有查询参数和锚点
pub fn cache_busted_url(url: &str, stamp: i64) -> String {
    let (base, fragment) = match url.find('#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}v={stamp}{fragment}")
}
