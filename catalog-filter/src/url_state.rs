//! 会话状态与 URL 查询字符串之间的转换。
//!
//! 识别三个参数：`page`（正整数）、`tags`（逗号分隔）、`search`（自由文本）。
//! 非法值在解析时被规范化，不会报错。

use std::borrow::Cow;
use std::collections::BTreeSet;

use crate::models::SessionState;

pub const PARAM_PAGE: &str = "page";
pub const PARAM_TAGS: &str = "tags";
pub const PARAM_SEARCH: &str = "search";

const RECOGNIZED: [&str; 3] = [PARAM_PAGE, PARAM_TAGS, PARAM_SEARCH];

/// 拆分查询字符串为未解码的 (键, 值) 对，接受开头的 `?`
fn raw_pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .strip_prefix('?')
        .unwrap_or(query)
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
}

/// 表单编码解码：`+` 视为空格，非法 UTF-8 以替换字符保留
fn decode(raw: &str) -> String {
    let spaced: Cow<str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned(),
    }
}

// 取第一次出现的参数值（未解码）
fn first_raw<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    raw_pairs(query)
        .find(|(k, _)| decode(k) == key)
        .map(|(_, v)| v)
}

fn parse_page(raw: Option<&str>) -> usize {
    raw.map(decode)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&p| p >= 1)
        .and_then(|p| usize::try_from(p).ok())
        .unwrap_or(1)
}

// 先按字面逗号拆分再逐个解码，标签内部的逗号以 %2C 形式保留
fn parse_tags(raw: Option<&str>) -> BTreeSet<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(decode)
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// 从查询字符串解析会话状态
pub fn parse(query: &str) -> SessionState {
    SessionState {
        query: first_raw(query, PARAM_SEARCH)
            .map(|v| decode(v).trim().to_string())
            .unwrap_or_default(),
        active_tags: parse_tags(first_raw(query, PARAM_TAGS)),
        page: parse_page(first_raw(query, PARAM_PAGE)),
    }
}

/// 序列化会话状态（不含 `?`）：总是输出 page，tags 和 search 仅在非空时输出
pub fn serialize(state: &SessionState) -> String {
    let mut out = format!("{PARAM_PAGE}={}", state.page.max(1));

    if !state.active_tags.is_empty() {
        let tags: Vec<Cow<str>> = state
            .active_tags
            .iter()
            .map(|tag| urlencoding::encode(tag))
            .collect();
        out.push_str(&format!("&{PARAM_TAGS}={}", tags.join(",")));
    }

    let search = state.query.trim();
    if !search.is_empty() {
        out.push_str(&format!("&{PARAM_SEARCH}={}", urlencoding::encode(search)));
    }

    out
}

/// 将状态写入已有的查询字符串：保留无关参数的原始形式和顺序，替换识别的参数
pub fn apply(existing: &str, state: &SessionState) -> String {
    let mut parts: Vec<String> = raw_pairs(existing)
        .filter(|(k, _)| !RECOGNIZED.contains(&decode(k).as_str()))
        .map(|(k, v)| if v.is_empty() { k.to_string() } else { format!("{k}={v}") })
        .collect();
    parts.push(serialize(state));
    parts.join("&")
}
