use std::collections::BTreeSet;

use catalog_common::Post;
use serde::{Deserialize, Serialize};

/// 会话状态 - (搜索词, 选中标签, 当前页) 三元组，是唯一的可变状态
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// 去除首尾空白后的搜索词，空字符串表示不筛选
    pub query: String,
    /// 选中的标签，空集合表示不筛选
    pub active_tags: BTreeSet<String>,
    /// 当前页码（从 1 开始）
    pub page: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            query: String::new(),
            active_tags: BTreeSet::new(),
            page: 1,
        }
    }
}

impl SessionState {
    /// 切换标签选中状态，返回切换后是否选中
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        if self.active_tags.remove(tag) {
            false
        } else {
            self.active_tags.insert(tag.to_string());
            true
        }
    }

    /// 清空搜索词和标签，并回到第一页
    pub fn clear_filters(&mut self) {
        self.query.clear();
        self.active_tags.clear();
        self.page = 1;
    }

    pub fn has_filters(&self) -> bool {
        !self.query.is_empty() || !self.active_tags.is_empty()
    }
}

/// 结果摘要 - 例如 “共 20 篇中的 12 篇，显示第 10-12 篇”
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultsSummary {
    /// 筛选后的数量
    pub count: usize,
    /// 数据集总数
    pub total: usize,
    /// 本页范围（从 1 开始，闭区间），无结果时为 None
    pub range: Option<(usize, usize)>,
}

/// 当前展示的视图 - 每次状态变化后重新推导
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PageView {
    pub page: usize,
    pub total_pages: usize,
    pub items: Vec<Post>,
    pub summary: ResultsSummary,
}

/// 事件处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// 状态已更新并重新渲染
    Applied,
    /// 事件被忽略，状态未变化
    Ignored,
}

impl Transition {
    pub fn is_applied(self) -> bool {
        self == Transition::Applied
    }
}
