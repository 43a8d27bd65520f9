//! 浏览器接口：把会话控制器包装为 JavaScript 可用的对象。
//!
//! 数据请求由页面脚本发起（`fetch(session.dataset_url(), { cache: "no-store" })`），
//! 响应状态和内容通过 `load_response` 交给控制器；网络异常通过 `load_failed` 上报。
//!
//! 渲染回调在事件方法执行期间被同步调用，此时会话对象处于可变借用中。
//! 回调内不能再调用同一个会话的任何方法（包括 `view()`），否则 wasm-bindgen 会抛出
//! "recursive use of an object" 错误；回调所需的数据都已通过参数传入。
//! 需要读取会话时，在事件方法返回之后再读取。
//!
//! 页面未提供 `renderNoTags` 时，会以 `renderTagControls([], [], "暂无标签")` 代替，
//! 第三个参数即应显示的提示文字。

use std::collections::BTreeSet;

use catalog_common::Post;
use js_sys::{Function, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::console;

use crate::config::CatalogConfig;
use crate::controller::SessionController;
use crate::dataset::{cache_busted_url, Dataset};
use crate::error::LoadError;
use crate::history::UrlHistory;
use crate::models::{ResultsSummary, Transition};
use crate::render::{Renderer, NO_TAGS_MESSAGE};

/// JavaScript 渲染器 - 按方法名调用页面提供的回调，未提供的回调会被跳过
pub struct JsRenderer {
    target: Object,
}

impl JsRenderer {
    pub fn new(target: Object) -> Self {
        Self { target }
    }

    fn callback(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.target, &JsValue::from_str(name))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
    }

    fn call(&self, name: &str, args: &[JsValue]) {
        let Some(callback) = self.callback(name) else {
            return;
        };
        let result = match args {
            [] => callback.call0(&self.target),
            [a] => callback.call1(&self.target, a),
            [a, b] => callback.call2(&self.target, a, b),
            _ => callback.apply(&self.target, &args.iter().collect()),
        };
        if let Err(e) = result {
            console::error_2(&JsValue::from_str(&format!("渲染回调 {} 执行失败", name)), &e);
        }
    }

    fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
        serde_wasm_bindgen::to_value(value).unwrap_or_else(|e| {
            console::error_1(&JsValue::from_str(&format!("序列化渲染数据失败: {}", e)));
            JsValue::UNDEFINED
        })
    }
}

impl Renderer for JsRenderer {
    fn render_loading(&mut self) {
        self.call("renderLoading", &[]);
    }

    fn render_page(&mut self, posts: &[&Post]) {
        self.call("renderPage", &[Self::to_js(posts)]);
    }

    fn render_tag_controls(&mut self, tags: &[String], active: &BTreeSet<String>) {
        self.call("renderTagControls", &[Self::to_js(tags), Self::to_js(active)]);
    }

    fn render_no_tags(&mut self) {
        if self.callback("renderNoTags").is_some() {
            self.call("renderNoTags", &[]);
        } else {
            let empty: [String; 0] = [];
            self.call(
                "renderTagControls",
                &[
                    Self::to_js(&empty),
                    Self::to_js(&BTreeSet::<String>::new()),
                    JsValue::from_str(NO_TAGS_MESSAGE),
                ],
            );
        }
    }

    fn render_pagination_controls(&mut self, current_page: usize, total_pages: usize) {
        self.call(
            "renderPaginationControls",
            &[JsValue::from(current_page as f64), JsValue::from(total_pages as f64)],
        );
    }

    fn render_results_summary(&mut self, summary: &ResultsSummary) {
        self.call("renderResultsSummary", &[Self::to_js(summary)]);
    }

    fn render_empty_state(&mut self) {
        self.call("renderEmptyState", &[]);
    }

    fn render_error(&mut self, message: &str) {
        self.call("renderError", &[JsValue::from_str(message)]);
    }
}

/// 浏览器地址栏 - 读取 `location.search`，通过 `history.replaceState` 写回
#[derive(Debug, Default)]
pub struct BrowserHistory;

impl UrlHistory for BrowserHistory {
    fn current_query(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default()
    }

    fn replace_query(&mut self, query: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let location = window.location();
        let path = location.pathname().unwrap_or_default();
        let hash = location.hash().unwrap_or_default();
        let url = if query.is_empty() {
            format!("{path}{hash}")
        } else {
            format!("{path}?{query}{hash}")
        };

        let result = window
            .history()
            .and_then(|history| history.replace_state_with_url(&JsValue::NULL, "", Some(&url)));
        if let Err(e) = result {
            console::error_2(&JsValue::from_str("更新地址栏失败"), &e);
        }
    }
}

fn millis(now_ms: f64) -> u64 {
    if now_ms.is_finite() && now_ms > 0.0 {
        now_ms as u64
    } else {
        0
    }
}

/// 目录会话JS接口 - 每个页面持有一个实例
#[wasm_bindgen]
pub struct CatalogSessionJS {
    inner: SessionController<JsRenderer, BrowserHistory>,
}

#[wasm_bindgen]
impl CatalogSessionJS {
    /// 创建会话：解析配置并从地址栏恢复状态
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, renderer: Object) -> Result<CatalogSessionJS, JsValue> {
        console_error_panic_hook::set_once();

        let config = CatalogConfig::from_json(config_json)
            .map_err(|e| JsValue::from_str(&format!("解析配置失败: {}", e)))?;

        Ok(Self {
            inner: SessionController::new(config, JsRenderer::new(renderer), BrowserHistory),
        })
    }

    /// 带缓存破坏参数的数据地址
    pub fn dataset_url(&self) -> String {
        cache_busted_url(
            &self.inner.config().dataset_url,
            chrono::Utc::now().timestamp_millis(),
        )
    }

    /// 提交数据请求的响应
    pub fn load_response(&mut self, status: u16, body: &[u8]) -> bool {
        let result = Dataset::from_response(status, body, &self.inner.config().placeholder_thumbnail);
        if let Err(e) = &result {
            console::log_1(&JsValue::from_str(&format!("加载数据失败: {}", e)));
        }
        self.inner.on_dataset_loaded(result).is_applied()
    }

    /// 数据请求在传输层失败
    pub fn load_failed(&mut self, message: &str) -> bool {
        console::log_1(&JsValue::from_str(&format!("网络请求失败: {}", message)));
        self.inner
            .on_dataset_loaded(Err(LoadError::Transport(message.to_string())))
            .is_applied()
    }

    /// 搜索框输入（未防抖）
    pub fn on_search_input(&mut self, text: &str, now_ms: f64) {
        self.inner.on_search_input(text, millis(now_ms));
    }

    /// 推进防抖定时器
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.inner.tick(millis(now_ms)).is_applied()
    }

    /// 下一次调用 `tick` 的时间
    pub fn next_deadline(&self) -> Option<f64> {
        self.inner.next_deadline().map(|deadline| deadline as f64)
    }

    pub fn on_search_changed(&mut self, text: &str) -> bool {
        self.inner.on_search_changed(text).is_applied()
    }

    pub fn on_tag_clicked(&mut self, tag: &str) -> bool {
        self.inner.on_tag_clicked(tag).is_applied()
    }

    pub fn on_clear_filters(&mut self) -> bool {
        self.inner.on_clear_filters().is_applied()
    }

    /// 翻页请求，非整数页码会被忽略
    pub fn on_page_requested(&mut self, page: f64) -> bool {
        if !page.is_finite() || page.fract() != 0.0 {
            return false;
        }
        self.inner.on_page_requested(page as i64) == Transition::Applied
    }

    /// 浏览器 popstate 事件
    pub fn on_history_navigated(&mut self) -> bool {
        self.inner.on_history_navigated().is_applied()
    }

    /// 当前会话状态（JSON）
    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.inner.state())
            .map_err(|e| JsValue::from_str(&format!("序列化状态失败: {}", e)))
    }

    /// 当前视图，数据未就绪时为 null
    pub fn view(&self) -> Result<JsValue, JsValue> {
        match self.inner.view() {
            Some(view) => serde_wasm_bindgen::to_value(&view)
                .map_err(|e| JsValue::from_str(&format!("序列化结果失败: {}", e))),
            None => Ok(JsValue::NULL),
        }
    }

    /// 所有标签（按字典序）
    pub fn tags(&self) -> Result<JsValue, JsValue> {
        let tags: &[String] = self.inner.tag_index().map(|index| index.tags()).unwrap_or(&[]);
        serde_wasm_bindgen::to_value(tags)
            .map_err(|e| JsValue::from_str(&format!("序列化标签失败: {}", e)))
    }
}
