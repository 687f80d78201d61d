use super::node::{MenuNode, NodeKind};
use std::collections::BTreeSet;

/// 当前展开的分组 key
pub type OpenKeys = BTreeSet<String>;

/// 展开判定：当前路径以菜单 path 为前缀，按路径段对齐
///
/// 这里有意不用字符串的 starts_with：前缀必须落在 `/` 边界上。
/// `/users/list` 覆盖 `/users/list` 与 `/users/list/7`，不覆盖 `/users/listing`。
pub fn path_is_prefix_of(menu_path: &str, current_path: &str) -> bool {
    let menu_path = trim_trailing_slash(menu_path);
    let current_path = trim_trailing_slash(current_path);
    if menu_path == "/" {
        return current_path.starts_with('/');
    }
    match current_path.strip_prefix(menu_path) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// 高亮判定：完全相等，忽略末尾斜杠
pub fn path_matches_exact(menu_path: &str, current_path: &str) -> bool {
    trim_trailing_slash(menu_path) == trim_trailing_slash(current_path)
}

fn trim_trailing_slash(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" if path.starts_with('/') => "/",
        trimmed => trimmed,
    }
}

/// 计算需要展开的分组
///
/// 任一后代链接命中当前路径（前缀匹配）时，从根到该链接路径上的所有分组都会展开。
/// 每个分支都会遍历，多个分支可以同时展开。结果只取决于输入，调用方用它整体替换旧集合。
pub fn resolve_open_keys(nodes: &[MenuNode], current_path: &str) -> OpenKeys {
    let mut open = OpenKeys::new();
    for node in nodes {
        mark_active(node, current_path, &mut open);
    }
    open
}

/// 返回该子树内是否存在命中的链接
fn mark_active(node: &MenuNode, current_path: &str, open: &mut OpenKeys) -> bool {
    match &node.kind {
        NodeKind::Link { path } => path_is_prefix_of(path, current_path),
        NodeKind::External { .. } => false,
        NodeKind::Group { children } => {
            let mut active = false;
            for child in children {
                active |= mark_active(child, current_path, open);
            }
            if active {
                open.insert(node.key.clone());
            }
            active
        }
    }
}

/// 精确命中当前路径的链接 key
pub fn highlighted_keys(nodes: &[MenuNode], current_path: &str) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    collect_highlighted(nodes, current_path, &mut keys);
    keys
}

fn collect_highlighted(nodes: &[MenuNode], current_path: &str, keys: &mut BTreeSet<String>) {
    for node in nodes {
        match &node.kind {
            NodeKind::Link { path } if path_matches_exact(path, current_path) => {
                keys.insert(node.key.clone());
            }
            NodeKind::Group { children } => collect_highlighted(children, current_path, keys),
            _ => {}
        }
    }
}

/// 切换单个分组的展开状态，连续两次调用恢复原集合
///
/// 不检查 key 是否存在于菜单中，渲染时只会读取存在的 key。
pub fn toggle(open: &OpenKeys, key: &str) -> OpenKeys {
    let mut next = open.clone();
    if !next.remove(key) {
        next.insert(key.to_owned());
    }
    next
}
