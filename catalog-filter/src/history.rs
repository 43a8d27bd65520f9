/// 地址栏边界 - 读取当前查询字符串，并以“替换当前历史记录”的方式写回
pub trait UrlHistory {
    /// 当前查询字符串（可带或不带开头的 `?`）
    fn current_query(&self) -> String;

    /// 替换当前历史记录的查询字符串，不刷新页面，也不新增历史记录
    fn replace_query(&mut self, query: &str);
}

/// 内存中的历史记录，模拟浏览器的后退与前进
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<String>,
    cursor: usize,
    replacements: usize,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("")
    }
}

impl MemoryHistory {
    pub fn new(initial_query: &str) -> Self {
        Self {
            entries: vec![initial_query.to_string()],
            cursor: 0,
            replacements: 0,
        }
    }

    /// 模拟用户通过链接进入新地址（新增历史记录并丢弃前进记录）
    pub fn push(&mut self, query: &str) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(query.to_string());
        self.cursor += 1;
    }

    /// 后退一步，已在最早记录时返回 false
    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// 前进一步，已在最新记录时返回 false
    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// 历史记录条数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `replace_query` 被调用的次数
    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl UrlHistory for MemoryHistory {
    fn current_query(&self) -> String {
        self.entries[self.cursor].clone()
    }

    fn replace_query(&mut self, query: &str) {
        self.entries[self.cursor] = query.to_string();
        self.replacements += 1;
    }
}
