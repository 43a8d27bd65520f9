//! 会话控制器：持有唯一的会话状态，响应输入事件并驱动筛选、分页、渲染和地址栏同步。
//!
//! 每个事件处理函数都是同步执行完毕的；加载数据之前（或加载失败之后），
//! 除历史导航外的事件都会被忽略。加载期间的搜索输入会保留到数据就绪时生效，
//! 加载失败则丢弃。

use catalog_common::Post;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::dataset::Dataset;
use crate::debounce::Debouncer;
use crate::error::LoadError;
use crate::filter::filter_indices;
use crate::history::UrlHistory;
use crate::models::{PageView, ResultsSummary, SessionState, Transition};
use crate::paginate::paginate;
use crate::render::Renderer;
use crate::tags::TagIndex;
use crate::url_state;

/// 已加载的数据及其派生结果
#[derive(Debug)]
struct Catalog {
    dataset: Dataset,
    tags: TagIndex,
    /// 当前筛选结果（数据集下标，已按展示顺序排列）
    filtered: Vec<usize>,
}

impl Catalog {
    fn new(dataset: Dataset) -> Self {
        let tags = TagIndex::build(dataset.posts());
        Self {
            dataset,
            tags,
            filtered: Vec::new(),
        }
    }

    fn refilter(&mut self, state: &SessionState, newest_first: bool) {
        self.filtered = filter_indices(self.dataset.posts(), &state.query, &state.active_tags);
        if newest_first {
            self.filtered.reverse();
        }
    }
}

#[derive(Debug)]
enum Phase {
    Loading,
    Ready(Catalog),
    Failed(String),
}

fn page_number(page: usize) -> i64 {
    i64::try_from(page).unwrap_or(i64::MAX)
}

/// 会话控制器
pub struct SessionController<R, H> {
    config: CatalogConfig,
    renderer: R,
    history: H,
    state: SessionState,
    phase: Phase,
    search: Debouncer<String>,
}

impl<R: Renderer, H: UrlHistory> SessionController<R, H> {
    /// 启动会话：从地址栏恢复状态并显示加载中，等待 `on_dataset_loaded`
    pub fn new(config: CatalogConfig, mut renderer: R, history: H) -> Self {
        let state = url_state::parse(&history.current_query());
        debug!(?state, "从地址栏恢复会话状态");
        renderer.render_loading();

        Self {
            search: Debouncer::new(config.debounce_ms),
            config,
            renderer,
            history,
            state,
            phase: Phase::Loading,
        }
    }

    /// 数据加载完成（或失败）。数据在每个会话中只加载一次
    pub fn on_dataset_loaded(&mut self, result: Result<Dataset, LoadError>) -> Transition {
        if !matches!(self.phase, Phase::Loading) {
            warn!("数据集已加载，忽略重复的加载结果");
            return Transition::Ignored;
        }

        match result {
            Ok(dataset) => {
                info!(posts = dataset.len(), "会话数据就绪");
                self.phase = Phase::Ready(Catalog::new(dataset));
                // 加载期间输入的搜索词直接生效
                if let Some(text) = self.search.cancel() {
                    self.state.query = text.trim().to_string();
                    self.state.page = 1;
                    debug!(query = %self.state.query, "应用加载期间的搜索输入");
                }
                // 保留从地址栏恢复的页码，只在越界时修正
                self.derive(true);
                self.render();
                self.persist();
            }
            Err(err) => {
                warn!(error = %err, "数据加载失败");
                let message = err.user_message();
                self.search.cancel();
                self.renderer.render_error(&message);
                self.phase = Phase::Failed(message);
            }
        }
        Transition::Applied
    }

    /// 搜索框输入（防抖前），由 `tick` 在静默期结束后触发搜索
    pub fn on_search_input(&mut self, text: &str, now_ms: u64) {
        self.search.schedule(text.to_string(), now_ms);
    }

    /// 推进防抖定时器，到期时执行搜索。
    ///
    /// 数据加载期间不会取出待触发的搜索词，它会在 `on_dataset_loaded` 成功时生效
    pub fn tick(&mut self, now_ms: u64) -> Transition {
        if !self.is_ready() {
            return Transition::Ignored;
        }
        match self.search.poll(now_ms) {
            Some(text) => self.on_search_changed(&text),
            None => Transition::Ignored,
        }
    }

    /// 下一次需要调用 `tick` 的时间
    pub fn next_deadline(&self) -> Option<u64> {
        if !self.is_ready() {
            return None;
        }
        self.search.deadline()
    }

    /// 搜索词变化（已防抖）：新的搜索使原有页码失效，回到第一页
    pub fn on_search_changed(&mut self, text: &str) -> Transition {
        if !self.is_ready() {
            return Transition::Ignored;
        }

        self.state.query = text.trim().to_string();
        self.state.page = 1;
        debug!(query = %self.state.query, "搜索词变化");
        self.commit(true)
    }

    /// 点击标签：切换选中状态并回到第一页
    pub fn on_tag_clicked(&mut self, tag: &str) -> Transition {
        let tag = tag.trim();
        if !self.is_ready() || tag.is_empty() {
            return Transition::Ignored;
        }

        let selected = self.state.toggle_tag(tag);
        self.state.page = 1;
        debug!(tag, selected, "切换标签");
        self.commit(true)
    }

    /// 清除全部筛选条件，同时取消尚未触发的搜索
    pub fn on_clear_filters(&mut self) -> Transition {
        if !self.is_ready() {
            return Transition::Ignored;
        }

        self.search.cancel();
        self.state.clear_filters();
        debug!("清除筛选条件");
        self.commit(true)
    }

    /// 请求翻页：超出 `[1, total_pages]` 的请求直接忽略，不做修正
    pub fn on_page_requested(&mut self, page: i64) -> Transition {
        let Some(total_pages) = self.total_pages() else {
            return Transition::Ignored;
        };
        if page < 1 || page > page_number(total_pages) {
            debug!(page, total_pages, "忽略越界的翻页请求");
            return Transition::Ignored;
        }

        // 筛选条件未变，无需重新筛选
        self.state.page = page as usize;
        self.commit(false)
    }

    /// 浏览器前进/后退：以地址栏为准整体替换状态，不回写地址栏
    pub fn on_history_navigated(&mut self) -> Transition {
        if matches!(self.phase, Phase::Failed(_)) {
            return Transition::Ignored;
        }

        self.state = url_state::parse(&self.history.current_query());
        debug!(state = ?self.state, "历史导航");

        if self.is_ready() {
            self.derive(true);
            self.render();
        }
        Transition::Applied
    }

    // 推导、渲染并写回地址栏
    fn commit(&mut self, refilter: bool) -> Transition {
        self.derive(refilter);
        self.render();
        self.persist();
        Transition::Applied
    }

    /// 重新筛选（可选）并把页码修正到合法范围
    fn derive(&mut self, refilter: bool) {
        let Phase::Ready(catalog) = &mut self.phase else {
            return;
        };
        if refilter {
            catalog.refilter(&self.state, self.config.newest_first);
        }

        let page = paginate(
            &catalog.filtered,
            self.config.effective_page_size(),
            page_number(self.state.page),
        );
        self.state.page = page.page;
    }

    fn render(&mut self) {
        let Phase::Ready(catalog) = &self.phase else {
            return;
        };
        let page_size = self.config.effective_page_size();
        let page = paginate(&catalog.filtered, page_size, page_number(self.state.page));

        if catalog.tags.is_empty() {
            self.renderer.render_no_tags();
        } else {
            self.renderer
                .render_tag_controls(catalog.tags.tags(), &self.state.active_tags);
        }

        if page.items.is_empty() {
            self.renderer.render_empty_state();
        } else {
            let posts: Vec<&Post> = page
                .items
                .iter()
                .filter_map(|&i| catalog.dataset.get(i))
                .collect();
            self.renderer.render_page(&posts);
        }

        self.renderer
            .render_pagination_controls(page.page, page.total_pages);
        self.renderer.render_results_summary(&ResultsSummary {
            count: catalog.filtered.len(),
            total: catalog.dataset.len(),
            range: page.range(page_size),
        });
    }

    fn persist(&mut self) {
        let query = url_state::apply(&self.history.current_query(), &self.state);
        self.history.replace_query(&query);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading)
    }

    /// 加载失败时的错误信息
    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn tag_index(&self) -> Option<&TagIndex> {
        match &self.phase {
            Phase::Ready(catalog) => Some(&catalog.tags),
            _ => None,
        }
    }

    /// 当前筛选结果的总页数，数据未就绪时为 None
    pub fn total_pages(&self) -> Option<usize> {
        match &self.phase {
            Phase::Ready(catalog) => Some(crate::paginate::total_pages(
                catalog.filtered.len(),
                self.config.effective_page_size(),
            )),
            _ => None,
        }
    }

    /// 当前展示的视图
    pub fn view(&self) -> Option<PageView> {
        let Phase::Ready(catalog) = &self.phase else {
            return None;
        };
        let page_size = self.config.effective_page_size();
        let page = paginate(&catalog.filtered, page_size, page_number(self.state.page));

        Some(PageView {
            page: page.page,
            total_pages: page.total_pages,
            items: page
                .items
                .iter()
                .filter_map(|&i| catalog.dataset.get(i).cloned())
                .collect(),
            summary: ResultsSummary {
                count: catalog.filtered.len(),
                total: catalog.dataset.len(),
                range: page.range(page_size),
            },
        })
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;
    use crate::render::{RecordingRenderer, RenderCall};
    use pretty_assertions::assert_eq;

    type Session = SessionController<RecordingRenderer, MemoryHistory>;

    fn post(n: usize, tags: &[&str]) -> Post {
        Post {
            url: format!("https://blog.example/{n}"),
            title: format!("Post {n}"),
            thumbnail: "assets/placeholder.png".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn numbered(count: usize) -> Dataset {
        Dataset::from_posts((1..=count).map(|n| post(n, &["General"])).collect())
    }

    fn titles(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
        range.map(|n| format!("Post {n}")).collect()
    }

    fn config() -> CatalogConfig {
        CatalogConfig {
            page_size: 9,
            newest_first: false,
            ..CatalogConfig::default()
        }
    }

    fn session(url: &str, dataset: Dataset) -> Session {
        let mut session = SessionController::new(config(), RecordingRenderer::new(), MemoryHistory::new(url));
        assert_eq!(session.on_dataset_loaded(Ok(dataset)), Transition::Applied);
        session
    }

    #[test]
    fn startup_shows_loading_then_first_page() {
        let mut session = SessionController::new(config(), RecordingRenderer::new(), MemoryHistory::new(""));
        assert!(session.is_loading());
        assert_eq!(session.renderer_mut().take(), vec![RenderCall::Loading]);

        session.on_dataset_loaded(Ok(numbered(20)));
        assert_eq!(session.renderer().last_page(), Some(titles(1..=9).as_slice()));
        assert_eq!(session.renderer().last_pagination(), Some((1, 3)));
        assert_eq!(
            session.renderer().last_summary(),
            Some(ResultsSummary {
                count: 20,
                total: 20,
                range: Some((1, 9)),
            })
        );
        assert_eq!(session.history().current_query(), "page=1");
    }

    #[test]
    fn startup_honors_page_from_url() {
        let session = session("?page=3", numbered(20));
        assert_eq!(session.state().page, 3);
        assert_eq!(session.renderer().last_page(), Some(titles(19..=20).as_slice()));
    }

    #[test]
    fn startup_clamps_stale_page_and_rewrites_url() {
        let session = session("?page=7&search=post", numbered(20));
        assert_eq!(session.state().page, 3);
        assert_eq!(session.history().current_query(), "page=3&search=post");
    }

    #[test]
    fn fetch_failure_is_terminal() {
        let mut session = SessionController::new(config(), RecordingRenderer::new(), MemoryHistory::new(""));
        session.on_dataset_loaded(Err(LoadError::Status(500)));

        assert!(session.error().is_some());
        assert!(matches!(session.renderer().calls.last(), Some(RenderCall::Error(_))));
        assert_eq!(session.on_search_changed("x"), Transition::Ignored);
        assert_eq!(session.on_tag_clicked("General"), Transition::Ignored);
        assert_eq!(session.on_page_requested(1), Transition::Ignored);
        assert_eq!(session.on_history_navigated(), Transition::Ignored);
        assert_eq!(session.on_dataset_loaded(Ok(numbered(3))), Transition::Ignored);
        assert_eq!(session.history().replacements(), 0);
    }

    #[test]
    fn events_before_load_are_ignored() {
        let mut session = SessionController::new(config(), RecordingRenderer::new(), MemoryHistory::new(""));
        assert_eq!(session.on_tag_clicked("Go"), Transition::Ignored);
        assert_eq!(session.on_clear_filters(), Transition::Ignored);
        assert_eq!(session.on_page_requested(1), Transition::Ignored);
        assert!(session.view().is_none());
    }

    #[test]
    fn history_navigation_while_loading_seeds_state() {
        let mut session = SessionController::new(config(), RecordingRenderer::new(), MemoryHistory::new(""));
        session.history_mut().push("page=2");
        assert_eq!(session.on_history_navigated(), Transition::Applied);

        session.on_dataset_loaded(Ok(numbered(20)));
        assert_eq!(session.state().page, 2);
        assert_eq!(session.renderer().last_page(), Some(titles(10..=18).as_slice()));
    }

    #[test]
    fn search_typed_while_loading_applies_on_load() {
        let mut session =
            SessionController::new(config(), RecordingRenderer::new(), MemoryHistory::new("page=2"));
        session.on_search_input("Post 1", 0);
        assert_eq!(session.tick(1_000), Transition::Ignored);
        assert_eq!(session.next_deadline(), None);

        session.on_dataset_loaded(Ok(numbered(20)));
        assert_eq!(session.state().query, "Post 1");
        assert_eq!(session.state().page, 1);
        assert_eq!(session.history().current_query(), "page=1&search=Post%201");
        assert_eq!(session.tick(2_000), Transition::Ignored);
    }

    #[test]
    fn search_typed_before_failed_load_is_dropped() {
        let mut session =
            SessionController::new(config(), RecordingRenderer::new(), MemoryHistory::new(""));
        session.on_search_input("Post 1", 0);
        session.on_dataset_loaded(Err(LoadError::Status(500)));
        assert_eq!(session.next_deadline(), None);
        assert_eq!(session.tick(1_000), Transition::Ignored);
        assert_eq!(session.state().query, "");
    }

    #[test]
    fn search_resets_page_and_updates_url() {
        let mut session = session("?page=2", numbered(20));
        assert_eq!(session.on_search_changed("  POST 1  "), Transition::Applied);

        // Post 1, Post 10..Post 19
        assert_eq!(session.state().query, "POST 1");
        assert_eq!(session.state().page, 1);
        assert_eq!(session.renderer().last_pagination(), Some((1, 2)));
        assert_eq!(session.history().current_query(), "page=1&search=POST%201");
    }

    #[test]
    fn debounced_input_fires_once_with_latest_text() {
        let mut session = session("", numbered(20));
        let replacements = session.history().replacements();

        session.on_search_input("p", 0);
        session.on_search_input("po", 120);
        session.on_search_input("Post 2", 250);
        assert_eq!(session.next_deadline(), Some(550));

        assert_eq!(session.tick(400), Transition::Ignored);
        assert_eq!(session.history().replacements(), replacements);

        assert_eq!(session.tick(550), Transition::Applied);
        assert_eq!(session.state().query, "Post 2");
        assert_eq!(session.history().replacements(), replacements + 1);
        assert_eq!(session.tick(10_000), Transition::Ignored);
    }

    #[test]
    fn tag_toggle_uses_union_and_resets_page() {
        let dataset = Dataset::from_posts(vec![post(1, &["Go"]), post(2, &["Rust"]), post(3, &["Go", "Rust"])]);
        let mut session = session("", dataset);

        session.on_tag_clicked("Go");
        assert_eq!(session.renderer().last_page(), Some(["Post 1".to_string(), "Post 3".to_string()].as_slice()));
        assert_eq!(session.history().current_query(), "page=1&tags=Go");

        session.on_tag_clicked("Rust");
        assert_eq!(session.view().map(|v| v.items.len()), Some(3));

        session.on_tag_clicked("Go");
        assert_eq!(session.renderer().last_page(), Some(["Post 2".to_string(), "Post 3".to_string()].as_slice()));
        assert_eq!(session.history().current_query(), "page=1&tags=Rust");
    }

    #[test]
    fn tag_controls_reflect_active_set() {
        let dataset = Dataset::from_posts(vec![post(1, &["Rust"]), post(2, &["Go"])]);
        let mut session = session("", dataset);
        session.renderer_mut().take();

        session.on_tag_clicked("Rust");
        let calls = session.renderer_mut().take();
        assert_eq!(
            calls[0],
            RenderCall::TagControls(
                vec!["Go".to_string(), "Rust".to_string()],
                ["Rust".to_string()].into_iter().collect()
            )
        );
    }

    #[test]
    fn render_pass_carries_the_whole_view() {
        let mut session = session("", numbered(20));
        session.renderer_mut().take();

        session.on_page_requested(2);
        assert_eq!(
            session.renderer_mut().take(),
            vec![
                RenderCall::TagControls(vec!["General".to_string()], std::collections::BTreeSet::new()),
                RenderCall::Page(titles(10..=18)),
                RenderCall::Pagination(2, 3),
                RenderCall::Summary(ResultsSummary {
                    count: 20,
                    total: 20,
                    range: Some((10, 18)),
                }),
            ]
        );
    }

    #[test]
    fn out_of_range_page_request_after_filter_change_is_ignored() {
        let mut posts: Vec<Post> = (1..=20).map(|n| post(n, &["Go"])).collect();
        posts.extend((21..=40).map(|n| post(n, &["Rust"])));
        let mut session = session("", Dataset::from_posts(posts));

        assert_eq!(session.total_pages(), Some(5));
        assert_eq!(session.on_page_requested(4), Transition::Applied);
        assert_eq!(session.state().page, 4);

        session.on_tag_clicked("Go");
        assert_eq!(session.total_pages(), Some(3));
        assert_eq!(session.state().page, 1);

        let replacements = session.history().replacements();
        assert_eq!(session.on_page_requested(5), Transition::Ignored);
        assert_eq!(session.on_page_requested(0), Transition::Ignored);
        assert_eq!(session.on_page_requested(-1), Transition::Ignored);
        assert_eq!(session.state().page, 1);
        assert_eq!(session.history().replacements(), replacements);
    }

    #[test]
    fn page_request_does_not_touch_filters() {
        let mut session = session("?search=post", numbered(20));
        assert_eq!(session.on_page_requested(3), Transition::Applied);
        assert_eq!(session.state().query, "post");
        assert_eq!(session.renderer().last_page(), Some(titles(19..=20).as_slice()));
        assert_eq!(session.history().current_query(), "page=3&search=post");
    }

    #[test]
    fn clear_filters_is_idempotent() {
        let mut session = session("?page=2&tags=General&search=post", numbered(20));
        session.on_clear_filters();
        let once = (session.state().clone(), session.history().current_query());
        session.on_clear_filters();
        let twice = (session.state().clone(), session.history().current_query());

        assert_eq!(once, twice);
        assert_eq!(once.0, SessionState::default());
        assert_eq!(once.1, "page=1");
    }

    #[test]
    fn clear_filters_cancels_pending_search() {
        let mut session = session("", numbered(20));
        session.on_search_input("Post 7", 0);
        session.on_clear_filters();
        assert_eq!(session.next_deadline(), None);
        assert_eq!(session.tick(1_000), Transition::Ignored);
        assert_eq!(session.state().query, "");
    }

    #[test]
    fn history_navigation_restores_state_without_writing_url() {
        let mut session = session("", numbered(20));
        session.history_mut().push("page=3&search=post");
        let replacements = session.history().replacements();

        assert_eq!(session.on_history_navigated(), Transition::Applied);
        assert_eq!(session.state().page, 3);
        assert_eq!(session.state().query, "post");
        assert_eq!(session.renderer().last_page(), Some(titles(19..=20).as_slice()));
        assert_eq!(session.history().replacements(), replacements);

        session.history_mut().back();
        session.on_history_navigated();
        assert_eq!(session.state(), &SessionState::default());
        assert_eq!(session.history().current_query(), "page=1");
    }

    #[test]
    fn history_navigation_clamps_without_rewriting() {
        let mut session = session("", numbered(20));
        session.history_mut().push("page=9");
        session.on_history_navigated();
        assert_eq!(session.state().page, 3);
        assert_eq!(session.history().current_query(), "page=9");
    }

    #[test]
    fn newest_first_reverses_display_order() {
        let mut session = SessionController::new(
            CatalogConfig {
                page_size: 9,
                newest_first: true,
                ..CatalogConfig::default()
            },
            RecordingRenderer::new(),
            MemoryHistory::new(""),
        );
        session.on_dataset_loaded(Ok(numbered(20)));
        assert_eq!(
            session.renderer().last_page(),
            Some(titles(12..=20).into_iter().rev().collect::<Vec<_>>().as_slice())
        );
    }

    #[test]
    fn empty_result_renders_empty_state() {
        let mut session = session("", numbered(5));
        session.renderer_mut().take();
        session.on_search_changed("nothing matches this");

        let calls = session.renderer_mut().take();
        assert!(calls.contains(&RenderCall::Empty));
        assert!(calls.contains(&RenderCall::Pagination(1, 1)));
        assert!(!calls.iter().any(|call| matches!(call, RenderCall::Page(_))));
        assert_eq!(
            calls.last(),
            Some(&RenderCall::Summary(ResultsSummary {
                count: 0,
                total: 5,
                range: None,
            }))
        );
    }

    #[test]
    fn dataset_without_tags_still_searches() {
        let dataset = Dataset::from_posts((1..=3).map(|n| post(n, &[])).collect());
        let mut session = session("", dataset);
        assert!(session.renderer().calls.contains(&RenderCall::NoTags));

        session.on_search_changed("post 2");
        assert_eq!(session.renderer().last_page(), Some(["Post 2".to_string()].as_slice()));
    }

    #[test]
    fn unrelated_url_parameters_survive() {
        let mut session = session("?ref=newsletter", numbered(20));
        assert_eq!(session.history().current_query(), "ref=newsletter&page=1");
        session.on_page_requested(2);
        assert_eq!(session.history().current_query(), "ref=newsletter&page=2");
    }
}
