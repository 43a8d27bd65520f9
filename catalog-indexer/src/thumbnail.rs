//! 从文章页面中查找封面图地址（离线模式读取保存下来的页面，在线模式见 `download`）。
//!
//! 查找顺序：`og:image` → `twitter:image` → JSON-LD 中的 `image` → 正文中第一张 Medium CDN 图片
//! （优先选择大尺寸版本）。找到的地址会去掉查询参数和 `/resize:...` 路径段。

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use catalog_common::RawPost;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

static RE_QUERY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?.*$").unwrap());
static RE_RESIZE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/resize:[^/]+").unwrap());

/// 大尺寸图片的标识
const LARGE_SIZES: [&str; 4] = ["828", "1400", "2000", "4800"];

/// 去掉查询参数和缩放路径段，得到原图地址
pub fn clean_image_url(url: &str) -> String {
    let without_query = RE_QUERY.replace(url.trim(), "");
    RE_RESIZE.replace_all(&without_query, "").into_owned()
}

fn is_medium_image(src: &str) -> bool {
    src.contains("miro.medium.com") || src.contains("cdn-images")
}

/// 从 HTML 文本中提取封面图地址
pub fn extract_image_url(html: &str) -> Option<String> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .ok()?;

    let mut page = PageImages::default();
    collect(&dom.document, &mut page);

    if let Some(url) = page.meta.get("og:image").or_else(|| page.meta.get("twitter:image")) {
        return Some(clean_image_url(url));
    }

    if let Some(url) = page.json_ld.iter().find_map(|text| json_ld_image(text)) {
        return Some(clean_image_url(&url));
    }

    let medium: Vec<&String> = page.images.iter().filter(|src| is_medium_image(src)).collect();
    medium
        .iter()
        .find(|src| LARGE_SIZES.iter().any(|size| src.contains(*size)))
        .or_else(|| medium.first())
        .map(|src| clean_image_url(src))
}

// 解析 JSON-LD 中的 image 字段：字符串、{ "url": ... } 或数组
fn json_ld_image(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text.trim()).ok()?;
    image_value(value.get("image")?)
}

fn image_value(image: &serde_json::Value) -> Option<String> {
    match image {
        serde_json::Value::String(url) if !url.trim().is_empty() => Some(url.clone()),
        serde_json::Value::Object(map) => map.get("url").and_then(image_value),
        serde_json::Value::Array(items) => items.iter().find_map(image_value),
        _ => None,
    }
}

/// 页面中与图片相关的信息
#[derive(Default, Debug)]
struct PageImages {
    /// meta 标签：name 或 property -> content
    meta: HashMap<String, String>,
    /// JSON-LD 脚本内容
    json_ld: Vec<String>,
    /// 按文档顺序排列的 img src
    images: Vec<String>,
}

fn attr(attrs: &[html5ever::Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.to_string())
}

fn collect(handle: &Handle, page: &mut PageImages) {
    if let NodeData::Element { ref name, ref attrs, .. } = handle.data {
        let attrs = attrs.borrow();
        match &*name.local {
            "meta" => {
                let key = attr(&attrs, "property").or_else(|| attr(&attrs, "name"));
                if let (Some(key), Some(content)) = (key, attr(&attrs, "content")) {
                    // 保留第一次出现的值
                    page.meta.entry(key).or_insert(content);
                }
            }
            "script" if attr(&attrs, "type").as_deref() == Some("application/ld+json") => {
                let mut text = String::new();
                for child in handle.children.borrow().iter() {
                    if let NodeData::Text { ref contents } = child.data {
                        text.push_str(&contents.borrow());
                    }
                }
                page.json_ld.push(text);
            }
            "img" => {
                if let Some(src) = attr(&attrs, "src").filter(|s| !s.is_empty()) {
                    page.images.push(src);
                }
            }
            _ => {}
        }
    }

    for child in handle.children.borrow().iter() {
        collect(child, page);
    }
}

/// 文章链接对应的页面文件名（不含扩展名）：链接路径的最后一段
pub fn page_slug(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    path.split('/')
        .skip(1)
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// 封面图查找结果
#[derive(Debug, Default)]
pub struct ThumbnailReport {
    /// 缩略图文件名 -> 原图地址
    pub manifest: BTreeMap<String, String>,
    /// 缺少链接或缩略图，或缩略图文件已存在
    pub skipped: usize,
    /// 找不到页面或页面中没有图片
    pub failed: Vec<String>,
}

impl ThumbnailReport {
    pub fn discovered(&self) -> usize {
        self.manifest.len()
    }
}

// 建立 页面文件名 -> 路径 的映射
fn index_pages(pages_dir: &Path) -> HashMap<String, PathBuf> {
    WalkDir::new(pages_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
        })
        .filter_map(|entry| {
            let stem = entry.path().file_stem()?.to_string_lossy().into_owned();
            Some((stem, entry.into_path()))
        })
        .collect()
}

/// 需要查找封面图的文章：返回文章链接和缩略图文件名。
///
/// 缺少链接或缩略图字段，或缩略图文件已存在于 `assets_dir` 中时返回 `None`
pub fn pending_thumbnail<'a>(post: &'a RawPost, assets_dir: Option<&Path>) -> Option<(&'a str, String)> {
    let url = post.url.as_deref().map(str::trim).filter(|url| !url.is_empty())?;
    let thumbnail = post
        .thumbnail
        .as_deref()
        .map(str::trim)
        .filter(|thumbnail| !thumbnail.is_empty())?;
    let filename = Path::new(thumbnail).file_name()?.to_string_lossy().into_owned();

    if assets_dir.is_some_and(|dir| dir.join(&filename).exists()) {
        return None;
    }
    Some((url, filename))
}

/// 为缺少缩略图文件的文章查找封面图地址
pub fn discover_thumbnails(
    posts: &[RawPost],
    pages_dir: &Path,
    assets_dir: Option<&Path>,
) -> Result<ThumbnailReport> {
    let pages = index_pages(pages_dir);
    debug!(pages = pages.len(), "已扫描页面目录");

    let mut report = ThumbnailReport::default();
    let total = posts.len();

    for (i, post) in posts.iter().enumerate() {
        let position = format!("[{}/{}]", i + 1, total);
        let Some((url, filename)) = pending_thumbnail(post, assets_dir) else {
            debug!("{position} 缺少链接或缩略图，或缩略图已存在，跳过");
            report.skipped += 1;
            continue;
        };

        let Some(page_path) = page_slug(url).and_then(|slug| pages.get(&slug)) else {
            warn!("{position} 找不到保存的页面: {url}");
            report.failed.push(url.to_string());
            continue;
        };

        let html = fs::read_to_string(page_path)
            .with_context(|| format!("无法读取文件 {}", page_path.display()))?;

        match extract_image_url(&html) {
            Some(image_url) => {
                debug!("{position} 找到图片: {image_url}");
                report.manifest.insert(filename, image_url);
            }
            None => {
                warn!("{position} 页面中没有图片: {}", page_path.display());
                report.failed.push(url.to_string());
            }
        }
    }

    Ok(report)
}
