use std::path::PathBuf;

use catalog_common::SnapshotError;
use thiserror::Error;

/// 数据加载错误 - 对本次会话而言是终止性的
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("加载数据失败: HTTP {0}")]
    Status(u16),

    #[error("网络请求失败: {0}")]
    Transport(String),

    #[error("解析数据失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("解析快照失败: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl LoadError {
    /// 展示给访问者的错误信息
    pub fn user_message(&self) -> String {
        format!("无法加载文章列表，请刷新页面重试。({self})")
    }
}

/// 快照构建错误
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("无法构建索引: 没有文章数据")]
    Empty,

    #[error("写入文件 `{0}` 失败")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("序列化 JSON 失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("压缩快照失败: {0}")]
    Snapshot(#[from] SnapshotError),
}
