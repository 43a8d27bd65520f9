use std::fs;
use std::path::Path;

use catalog_common::compression::to_compressed;
use catalog_common::{CatalogSnapshot, Post, SnapshotMetadata, SNAPSHOT_VERSION};
use chrono::Utc;
use tracing::{debug, info};

use crate::error::BuildError;
use crate::tags::TagIndex;

/// 目录快照构建器 - 离线工具使用
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    posts: Vec<Post>,
}

impl CatalogBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加文章
    pub fn add_post(&mut self, post: Post) {
        self.posts.push(post);
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// 构建标签索引
    pub fn tag_index(&self) -> TagIndex {
        TagIndex::build(&self.posts)
    }

    /// 构建快照
    pub fn build_snapshot(&self, version: &str) -> Result<CatalogSnapshot, BuildError> {
        if self.posts.is_empty() {
            return Err(BuildError::Empty);
        }

        let tag_count = self.tag_index().len();
        info!(posts = self.posts.len(), tags = tag_count, "快照构建完成");

        Ok(CatalogSnapshot {
            metadata: SnapshotMetadata {
                post_count: self.posts.len(),
                tag_count,
                created_at: Utc::now(),
                version: version.to_string(),
            },
            posts: self.posts.clone(),
        })
    }

    /// 保存压缩快照，返回写入的字节数
    pub fn save_snapshot(&self, path: &Path, version: &str) -> Result<usize, BuildError> {
        let snapshot = self.build_snapshot(version)?;
        let data = to_compressed(&snapshot, SNAPSHOT_VERSION)?;
        fs::write(path, &data).map_err(|e| BuildError::Io(path.to_path_buf(), e))?;
        debug!(path = %path.display(), bytes = data.len(), "快照已写入");
        Ok(data.len())
    }

    /// 保存规范化后的 JSON 列表，返回写入的字节数
    pub fn save_json(&self, path: &Path) -> Result<usize, BuildError> {
        if self.posts.is_empty() {
            return Err(BuildError::Empty);
        }
        let json = serde_json::to_vec_pretty(&self.posts)?;
        fs::write(path, &json).map_err(|e| BuildError::Io(path.to_path_buf(), e))?;
        debug!(path = %path.display(), bytes = json.len(), "JSON 已写入");
        Ok(json.len())
    }
}
