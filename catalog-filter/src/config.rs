use catalog_common::DEFAULT_PLACEHOLDER;
use serde::{Deserialize, Serialize};

/// 默认每页条数
pub const DEFAULT_PAGE_SIZE: usize = 9;

/// 搜索输入的默认防抖间隔（毫秒）
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// 默认数据文件地址
pub const DEFAULT_DATASET_URL: &str = "blogs.json";

/// 目录会话配置 - 客户端以 JSON 传入，所有字段可省略
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogConfig {
    /// 每页条数
    pub page_size: usize,
    /// 搜索防抖间隔（毫秒）
    pub debounce_ms: u64,
    /// 缺少缩略图时使用的占位图
    pub placeholder_thumbnail: String,
    /// 是否倒序展示（数据按时间追加时即最新在前）
    pub newest_first: bool,
    /// 数据文件地址
    pub dataset_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            placeholder_thumbnail: DEFAULT_PLACEHOLDER.to_string(),
            newest_first: true,
            dataset_url: DEFAULT_DATASET_URL.to_string(),
        }
    }
}

impl CatalogConfig {
    /// 从 JSON 字符串解析配置，空字符串视为默认配置
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }

    /// 实际使用的每页条数，至少为 1
    pub fn effective_page_size(&self) -> usize {
        self.page_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CatalogConfig::from_json(r#"{"page_size": 8}"#).unwrap();
        assert_eq!(
            config,
            CatalogConfig {
                page_size: 8,
                ..CatalogConfig::default()
            }
        );
        assert_eq!(CatalogConfig::from_json("  ").unwrap(), CatalogConfig::default());
    }

    #[test]
    fn zero_page_size_is_raised_to_one() {
        let config = CatalogConfig {
            page_size: 0,
            ..CatalogConfig::default()
        };
        assert_eq!(config.effective_page_size(), 1);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(CatalogConfig::from_json("{page_size: }").is_err());
    }
}
