use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// 内置菜单定义，init 时写入 menu.toml，未配置 [menu] file 时直接使用
pub const DEFAULT_MENU: &str = include_str!("default_menu.toml");

/// menu.toml 的完整结构
#[derive(Debug, Default, Deserialize)]
pub struct MenuFile {
    #[serde(default)]
    pub menu: Vec<MenuItemConfig>,
}

/// [[menu]] 单个菜单项的原始形态
///
/// 字段与配置文件一一对应，全部可选；是否合法由 [`MenuDefinition::from_items`] 判定，
/// 渲染层只接触校验后的 [`MenuNode`]。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MenuItemConfig {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub label: String,
    pub icon: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub children: Option<Vec<MenuItemConfig>>,
}

/// 校验后的菜单节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuNode {
    pub key: String,
    pub label: String,
    pub icon: Option<String>,
    /// 为空表示所有人可见
    pub permissions: Vec<String>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// 站内路由
    Link { path: String },
    /// 外部链接，总是在新窗口打开
    External { url: String },
    /// 可展开的分组，children 非空
    Group { children: Vec<MenuNode> },
}

impl MenuNode {
    /// 叶子节点返回空切片
    pub fn children(&self) -> &[MenuNode] {
        match &self.kind {
            NodeKind::Group { children } => children,
            _ => &[],
        }
    }
}

/// 测试用的节点构造器，生产代码只从配置文件构建节点
#[cfg(test)]
impl MenuNode {
    pub fn link(key: &str, label: &str, path: &str) -> Self {
        Self::new(key, label, NodeKind::Link { path: path.to_owned() })
    }

    pub fn external(key: &str, label: &str, url: &str) -> Self {
        Self::new(key, label, NodeKind::External { url: url.to_owned() })
    }

    pub fn group(key: &str, label: &str, children: Vec<MenuNode>) -> Self {
        Self::new(key, label, NodeKind::Group { children })
    }

    fn new(key: &str, label: &str, kind: NodeKind) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
            icon: None,
            permissions: Vec::new(),
            kind,
        }
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = permissions.iter().map(|p| (*p).to_owned()).collect();
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_owned());
        self
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. })
    }
}

/// 单条配置问题
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MenuIssue {
    #[error("{location} 的 key 不能为空")]
    EmptyKey { location: String },

    #[error("菜单项 key 重复：{key}")]
    DuplicateKey { key: String },

    #[error("分组菜单 {key} 不能设置 url")]
    GroupWithUrl { key: String },

    #[error("菜单项 {key} 的 children 为空，无法判断是分组还是链接")]
    EmptyChildren { key: String },

    #[error("菜单项 {key} 同时设置了 path 和 url")]
    PathAndUrl { key: String },

    #[error("菜单项 {key} 缺少 path 或 url")]
    MissingTarget { key: String },

    #[error("菜单项 {key} 的 path 必须以 / 开头：{path}")]
    RelativePath { key: String, path: String },
}

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("菜单定义校验失败（{} 个问题）：{}", issues.len(), join_issues(issues))]
    Invalid { issues: Vec<MenuIssue> },
}

fn join_issues(issues: &[MenuIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("；")
}

/// 启动时构建一次、此后只读的菜单定义
#[derive(Debug, Clone)]
pub struct MenuDefinition {
    items: Vec<MenuNode>,
}

impl MenuDefinition {
    /// 校验原始配置并转换为节点树，任何问题都会让整棵树被拒绝
    pub fn from_items(items: &[MenuItemConfig]) -> Result<Self, MenuError> {
        let mut checker = Checker::default();
        let nodes = checker.convert_all(items, "menu");
        if checker.issues.is_empty() {
            Ok(Self { items: nodes })
        } else {
            Err(MenuError::Invalid {
                issues: checker.issues,
            })
        }
    }

    /// 直接由已构造的节点组成定义，执行与配置文件相同的结构校验
    #[cfg(test)]
    pub fn from_nodes(items: Vec<MenuNode>) -> Result<Self, MenuError> {
        let mut checker = Checker::default();
        checker.check_nodes(&items, "menu");
        if checker.issues.is_empty() {
            Ok(Self { items })
        } else {
            Err(MenuError::Invalid {
                issues: checker.issues,
            })
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: MenuFile = toml::from_str(content).context("解析菜单定义失败")?;
        let definition = Self::from_items(&file.menu)?;
        Ok(definition)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取菜单文件 {} 失败", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("加载菜单文件 {} 失败", path.display()))
    }

    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(DEFAULT_MENU).context("内置菜单定义无效")
    }

    pub fn items(&self) -> &[MenuNode] {
        &self.items
    }

    /// 所有层级的节点总数
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[MenuNode]) -> usize {
            nodes.iter().map(|n| 1 + count(n.children())).sum()
        }
        count(&self.items)
    }
}

/// 仅返回问题列表，供 check 命令一次性展示
pub fn validate(items: &[MenuItemConfig]) -> Vec<MenuIssue> {
    let mut checker = Checker::default();
    checker.convert_all(items, "menu");
    checker.issues
}

#[derive(Default)]
struct Checker {
    seen: HashSet<String>,
    issues: Vec<MenuIssue>,
}

impl Checker {
    fn check_key(&mut self, key: &str, location: &str) {
        if key.is_empty() {
            self.issues.push(MenuIssue::EmptyKey {
                location: location.to_owned(),
            });
        } else if !self.seen.insert(key.to_owned()) {
            self.issues.push(MenuIssue::DuplicateKey { key: key.to_owned() });
        }
    }

    /// 对已构造的节点树做与 convert 相同的约束检查
    #[cfg(test)]
    fn check_nodes(&mut self, nodes: &[MenuNode], location: &str) {
        for (i, node) in nodes.iter().enumerate() {
            let location = format!("{location}[{i}]");
            let key = node.key.trim();
            self.check_key(key, &location);
            match &node.kind {
                NodeKind::Link { path } if !path.starts_with('/') => {
                    self.issues.push(MenuIssue::RelativePath {
                        key: key.to_owned(),
                        path: path.clone(),
                    });
                }
                NodeKind::Group { children } => {
                    if children.is_empty() {
                        self.issues.push(MenuIssue::EmptyChildren { key: key.to_owned() });
                    }
                    self.check_nodes(children, &format!("{location}.children"));
                }
                _ => {}
            }
        }
    }

    fn convert_all(&mut self, items: &[MenuItemConfig], location: &str) -> Vec<MenuNode> {
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| self.convert(item, &format!("{location}[{i}]")))
            .collect()
    }

    fn convert(&mut self, item: &MenuItemConfig, location: &str) -> Option<MenuNode> {
        let before = self.issues.len();
        let key = item.key.trim();
        self.check_key(key, location);

        let kind = match (&item.children, &item.path, &item.url) {
            (Some(children), _, url) => {
                if url.is_some() {
                    self.issues.push(MenuIssue::GroupWithUrl { key: key.to_owned() });
                }
                if children.is_empty() {
                    self.issues.push(MenuIssue::EmptyChildren { key: key.to_owned() });
                }
                // 分组自身的 path 不参与导航
                let children = self.convert_all(children, &format!("{location}.children"));
                NodeKind::Group { children }
            }
            (None, Some(_), Some(_)) => {
                self.issues.push(MenuIssue::PathAndUrl { key: key.to_owned() });
                return None;
            }
            (None, Some(path), None) => {
                if !path.starts_with('/') {
                    self.issues.push(MenuIssue::RelativePath {
                        key: key.to_owned(),
                        path: path.clone(),
                    });
                }
                NodeKind::Link { path: path.clone() }
            }
            (None, None, Some(url)) => NodeKind::External { url: url.clone() },
            (None, None, None) => {
                self.issues.push(MenuIssue::MissingTarget { key: key.to_owned() });
                return None;
            }
        };

        if self.issues.len() > before {
            return None;
        }

        Some(MenuNode {
            key: key.to_owned(),
            label: item.label.clone(),
            icon: item.icon.clone(),
            permissions: item.permissions.clone().unwrap_or_default(),
            kind,
        })
    }
}
