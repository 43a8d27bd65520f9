use std::collections::BTreeSet;
use std::fmt::Write;

use catalog_common::Post;
use catalog_filter::{
    CatalogConfig, Dataset, MemoryHistory, Renderer, ResultsSummary, SessionController, UrlHistory,
};
use catalog_filter::render::NO_TAGS_MESSAGE;

/// 纯文本渲染器 - 把渲染调用写成终端可读的文本
#[derive(Debug, Default)]
pub struct TextRenderer {
    out: String,
}

impl TextRenderer {
    pub fn into_output(self) -> String {
        self.out
    }
}

impl Renderer for TextRenderer {
    fn render_loading(&mut self) {
        let _ = writeln!(self.out, "加载中...");
    }

    fn render_page(&mut self, posts: &[&Post]) {
        for post in posts {
            let _ = writeln!(self.out, "  - {} <{}>", post.title, post.url);
            if !post.tags.is_empty() {
                let _ = writeln!(self.out, "    标签: {}", post.tags.join(", "));
            }
        }
    }

    fn render_tag_controls(&mut self, tags: &[String], active: &BTreeSet<String>) {
        let rendered: Vec<String> = tags
            .iter()
            .map(|tag| {
                if active.contains(tag) {
                    format!("[{tag}]")
                } else {
                    tag.clone()
                }
            })
            .collect();
        let _ = writeln!(self.out, "标签: {}", rendered.join(" "));
    }

    fn render_no_tags(&mut self) {
        let _ = writeln!(self.out, "标签: ({NO_TAGS_MESSAGE})");
    }

    fn render_pagination_controls(&mut self, current_page: usize, total_pages: usize) {
        let _ = writeln!(self.out, "第 {current_page} / {total_pages} 页");
    }

    fn render_results_summary(&mut self, summary: &ResultsSummary) {
        match summary.range {
            Some((start, end)) => {
                let _ = writeln!(
                    self.out,
                    "共 {} 篇中的 {} 篇，显示第 {start}-{end} 篇",
                    summary.total, summary.count
                );
            }
            None => {
                let _ = writeln!(self.out, "共 {} 篇中的 0 篇", summary.total);
            }
        }
    }

    fn render_empty_state(&mut self) {
        let _ = writeln!(self.out, "  (没有匹配的文章)");
    }

    fn render_error(&mut self, message: &str) {
        let _ = writeln!(self.out, "错误: {message}");
    }
}

/// 以给定的查询字符串打开目录，返回渲染结果和规范化后的地址
pub fn run_preview(dataset: Dataset, config: CatalogConfig, query: &str) -> (String, String) {
    let mut session = SessionController::new(config, TextRenderer::default(), MemoryHistory::new(query));
    session.on_dataset_loaded(Ok(dataset));

    let url = format!("?{}", session.history().current_query());
    let mut output = String::new();
    let _ = writeln!(output, "{url}");

    // 只保留加载完成后的输出
    let rendered = std::mem::take(session.renderer_mut()).into_output();
    output.push_str(rendered.trim_start_matches("加载中...\n"));
    (output, url)
}
