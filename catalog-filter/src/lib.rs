use wasm_bindgen::prelude::*;

// 导出模块
pub mod builder;
pub mod config;
pub mod controller;
pub mod dataset;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod history;
pub mod models;
pub mod paginate;
pub mod render;
pub mod tags;
pub mod url_state;
pub mod wasm;

pub use config::CatalogConfig;
pub use controller::SessionController;
pub use dataset::{cache_busted_url, Dataset};
pub use error::{BuildError, LoadError};
pub use filter::{filter_indices, filter_posts};
pub use history::{MemoryHistory, UrlHistory};
pub use models::{PageView, ResultsSummary, SessionState, Transition};
pub use paginate::{paginate, Page};
pub use render::Renderer;
pub use tags::TagIndex;

/// 初始化函数 - 设置错误处理
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// 版本信息
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
