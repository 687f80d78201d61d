use super::node::{MenuNode, NodeKind};
use super::open::{path_matches_exact, OpenKeys};
use serde::Serialize;

/// 交给模板或 JSON 接口的渲染结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuEntry {
    Link {
        key: String,
        label: String,
        icon: Option<String>,
        path: String,
        active: bool,
    },
    External {
        key: String,
        label: String,
        icon: Option<String>,
        url: String,
    },
    Group {
        key: String,
        label: String,
        icon: Option<String>,
        open: bool,
        children: Vec<MenuEntry>,
    },
}

#[cfg(test)]
impl MenuEntry {
    pub fn key(&self) -> &str {
        match self {
            Self::Link { key, .. } | Self::External { key, .. } | Self::Group { key, .. } => key,
        }
    }
}

/// 将已过滤的菜单树转换为渲染结构
///
/// 只读取输入，不再做权限判断。分组的 open 取自 `open`，链接的 active 按精确匹配计算。
pub fn render_menu(nodes: &[MenuNode], open: &OpenKeys, current_path: &str) -> Vec<MenuEntry> {
    nodes
        .iter()
        .map(|node| render_node(node, open, current_path))
        .collect()
}

fn render_node(node: &MenuNode, open: &OpenKeys, current_path: &str) -> MenuEntry {
    let key = node.key.clone();
    let label = node.label.clone();
    let icon = node.icon.clone();
    match &node.kind {
        NodeKind::Link { path } => MenuEntry::Link {
            active: path_matches_exact(path, current_path),
            path: path.clone(),
            key,
            label,
            icon,
        },
        NodeKind::External { url } => MenuEntry::External {
            url: url.clone(),
            key,
            label,
            icon,
        },
        NodeKind::Group { children } => MenuEntry::Group {
            open: open.contains(&node.key),
            children: render_menu(children, open, current_path),
            key,
            label,
            icon,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Vec<MenuNode> {
        vec![
            MenuNode::group(
                "users",
                "系统管理",
                vec![
                    MenuNode::link("user-list", "用户管理", "/users/list"),
                    MenuNode::link("user-menu", "菜单管理", "/users/menu"),
                ],
            )
            .with_icon("👥"),
            MenuNode::external("docs", "文档", "https://example.com"),
        ]
    }

    #[test]
    fn renders_three_shapes() {
        let open: OpenKeys = ["users".to_string()].into_iter().collect();
        let entries = render_menu(&tree(), &open, "/users/list");

        let value = serde_json::to_value(&entries).unwrap();
        assert_eq!(
            value,
            json!([
                {
                    "kind": "group",
                    "key": "users",
                    "label": "系统管理",
                    "icon": "👥",
                    "open": true,
                    "children": [
                        { "kind": "link", "key": "user-list", "label": "用户管理", "icon": null, "path": "/users/list", "active": true },
                        { "kind": "link", "key": "user-menu", "label": "菜单管理", "icon": null, "path": "/users/menu", "active": false },
                    ]
                },
                { "kind": "external", "key": "docs", "label": "文档", "icon": null, "url": "https://example.com" }
            ])
        );
    }

    #[test]
    fn open_state_comes_only_from_open_keys() {
        // 当前路径命中子项，但 open 集合为空时分组保持收起
        let entries = render_menu(&tree(), &OpenKeys::new(), "/users/list");
        match &entries[0] {
            MenuEntry::Group { open, children, .. } => {
                assert!(!open);
                assert_eq!(children[0].key(), "user-list");
            }
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn unknown_open_keys_are_ignored() {
        let open: OpenKeys = ["ghost".to_string()].into_iter().collect();
        let entries = render_menu(&tree(), &open, "/");
        assert!(matches!(&entries[0], MenuEntry::Group { open: false, .. }));
    }
}
