use std::collections::BTreeSet;

use catalog_common::Post;

use crate::models::ResultsSummary;

/// 数据集中没有任何标签时展示的提示
pub const NO_TAGS_MESSAGE: &str = "暂无标签";

/// 渲染边界 - 由展示层实现，控制器在每次推导后调用，从不回读布局状态
pub trait Renderer {
    /// 数据加载中
    fn render_loading(&mut self) {}

    /// 渲染当前页的文章
    fn render_page(&mut self, posts: &[&Post]);

    /// 渲染标签按钮
    fn render_tag_controls(&mut self, tags: &[String], active: &BTreeSet<String>);

    /// 数据集中没有任何标签，标签区域应显示 [`NO_TAGS_MESSAGE`] 之类的提示
    fn render_no_tags(&mut self);

    fn render_pagination_controls(&mut self, current_page: usize, total_pages: usize);

    fn render_results_summary(&mut self, summary: &ResultsSummary);

    /// 筛选结果为空
    fn render_empty_state(&mut self);

    /// 终止性错误（例如数据加载失败）
    fn render_error(&mut self, message: &str);
}

/// 记录所有渲染调用的渲染器，供测试使用
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingRenderer {
    pub calls: Vec<RenderCall>,
}

/// 一次渲染调用
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Loading,
    Page(Vec<String>),
    TagControls(Vec<String>, BTreeSet<String>),
    NoTags,
    Pagination(usize, usize),
    Summary(ResultsSummary),
    Empty,
    Error(String),
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出并清空已记录的调用
    pub fn take(&mut self) -> Vec<RenderCall> {
        std::mem::take(&mut self.calls)
    }

    /// 最近一次渲染的文章标题
    pub fn last_page(&self) -> Option<&[String]> {
        self.calls.iter().rev().find_map(|call| match call {
            RenderCall::Page(titles) => Some(titles.as_slice()),
            _ => None,
        })
    }

    /// 最近一次渲染的分页信息
    pub fn last_pagination(&self) -> Option<(usize, usize)> {
        self.calls.iter().rev().find_map(|call| match call {
            RenderCall::Pagination(current, total) => Some((*current, *total)),
            _ => None,
        })
    }

    pub fn last_summary(&self) -> Option<ResultsSummary> {
        self.calls.iter().rev().find_map(|call| match call {
            RenderCall::Summary(summary) => Some(*summary),
            _ => None,
        })
    }
}

impl Renderer for RecordingRenderer {
    fn render_loading(&mut self) {
        self.calls.push(RenderCall::Loading);
    }

    fn render_page(&mut self, posts: &[&Post]) {
        self.calls
            .push(RenderCall::Page(posts.iter().map(|p| p.title.clone()).collect()));
    }

    fn render_tag_controls(&mut self, tags: &[String], active: &BTreeSet<String>) {
        self.calls
            .push(RenderCall::TagControls(tags.to_vec(), active.clone()));
    }

    fn render_no_tags(&mut self) {
        self.calls.push(RenderCall::NoTags);
    }

    fn render_pagination_controls(&mut self, current_page: usize, total_pages: usize) {
        self.calls.push(RenderCall::Pagination(current_page, total_pages));
    }

    fn render_results_summary(&mut self, summary: &ResultsSummary) {
        self.calls.push(RenderCall::Summary(*summary));
    }

    fn render_empty_state(&mut self) {
        self.calls.push(RenderCall::Empty);
    }

    fn render_error(&mut self, message: &str) {
        self.calls.push(RenderCall::Error(message.to_string()));
    }
}
