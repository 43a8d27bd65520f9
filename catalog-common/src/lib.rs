pub mod compression;
pub mod models;

// 重新导出常用类型和函数，方便直接使用
pub use compression::{from_compressed, is_snapshot, to_compressed, SnapshotError, SNAPSHOT_VERSION};
pub use models::{normalize_tag, CatalogSnapshot, Post, RawPost, SnapshotMetadata, DEFAULT_PLACEHOLDER, UNTITLED};
