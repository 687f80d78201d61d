use super::node::{MenuNode, NodeKind};
use std::collections::HashMap;
use thiserror::Error;

/// 由外部权限来源构造，内置的会话权限判定不会失败
#[allow(dead_code)]
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("权限来源不可用：{0}")]
    Unavailable(String),
}

/// 权限判定能力，由认证层提供
///
/// 返回 `Err` 时按无权限处理。任何 `Fn(&str) -> bool` 都可以直接作为判定器使用。
pub trait PermissionCheck {
    fn check(&self, permission: &str) -> Result<bool, PermissionError>;
}

impl<F> PermissionCheck for F
where
    F: Fn(&str) -> bool,
{
    fn check(&self, permission: &str) -> Result<bool, PermissionError> {
        Ok(self(permission))
    }
}

/// 单次过滤内的权限缓存，同一权限只询问一次
struct Gate<'a, P: ?Sized> {
    perms: &'a P,
    memo: HashMap<String, bool>,
}

impl<P: PermissionCheck + ?Sized> Gate<'_, P> {
    fn granted(&mut self, permission: &str) -> bool {
        if let Some(&granted) = self.memo.get(permission) {
            return granted;
        }
        let granted = match self.perms.check(permission) {
            Ok(granted) => granted,
            Err(e) => {
                tracing::warn!("权限 {permission} 判定失败，按无权限处理：{e}");
                false
            }
        };
        self.memo.insert(permission.to_owned(), granted);
        granted
    }

    /// 空列表对所有人可见，否则满足任意一项即可
    fn allows(&mut self, permissions: &[String]) -> bool {
        permissions.is_empty() || permissions.iter().any(|p| self.granted(p))
    }
}

/// 按权限过滤菜单树，返回新树，不修改原定义
///
/// 分组需要同时通过自身权限检查且至少保留一个子项，否则整体移除。
pub fn filter_menu<P>(nodes: &[MenuNode], perms: &P) -> Vec<MenuNode>
where
    P: PermissionCheck + ?Sized,
{
    let mut gate = Gate {
        perms,
        memo: HashMap::new(),
    };
    filter_nodes(nodes, &mut gate)
}

fn filter_nodes<P>(nodes: &[MenuNode], gate: &mut Gate<'_, P>) -> Vec<MenuNode>
where
    P: PermissionCheck + ?Sized,
{
    nodes
        .iter()
        .filter_map(|node| {
            if !gate.allows(&node.permissions) {
                return None;
            }
            match &node.kind {
                NodeKind::Group { children } => {
                    let kept = filter_nodes(children, gate);
                    if kept.is_empty() {
                        return None;
                    }
                    Some(MenuNode {
                        key: node.key.clone(),
                        label: node.label.clone(),
                        icon: node.icon.clone(),
                        permissions: node.permissions.clone(),
                        kind: NodeKind::Group { children: kept },
                    })
                }
                NodeKind::Link { .. } | NodeKind::External { .. } => Some(node.clone()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn keys(nodes: &[MenuNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.key.as_str()).collect()
    }

    fn granting<'a>(held: &'a [&'a str]) -> impl Fn(&str) -> bool + 'a {
        move |p: &str| held.iter().any(|h| *h == p)
    }

    #[test]
    fn any_listed_permission_is_enough() {
        let tree = vec![MenuNode::link("n", "N", "/n").with_permissions(&["a", "b"])];

        for (held, visible) in [
            (&[][..], false),
            (&["a"][..], true),
            (&["b"][..], true),
            (&["a", "b"][..], true),
            (&["c"][..], false),
        ] {
            let filtered = filter_menu(&tree, &granting(held));
            assert_eq!(filtered.len() == 1, visible, "held = {held:?}");
        }
    }

    #[test]
    fn empty_permissions_are_always_visible() {
        let tree = vec![
            MenuNode::link("open", "Open", "/open"),
            MenuNode::link("empty", "Empty", "/empty").with_permissions(&[]),
        ];
        let filtered = filter_menu(&tree, &|_: &str| false);
        assert_eq!(keys(&filtered), ["open", "empty"]);
    }

    #[test]
    fn group_without_surviving_children_is_pruned() {
        let tree = vec![MenuNode::group(
            "g",
            "G",
            vec![
                MenuNode::link("a", "A", "/g/a").with_permissions(&["a"]),
                MenuNode::link("b", "B", "/g/b").with_permissions(&["b"]),
            ],
        )];
        assert!(filter_menu(&tree, &granting(&["c"])).is_empty());

        let filtered = filter_menu(&tree, &granting(&["b"]));
        assert_eq!(keys(&filtered), ["g"]);
        assert_eq!(keys(filtered[0].children()), ["b"]);
    }

    #[test]
    fn group_needs_its_own_permission_too() {
        let tree = vec![
            MenuNode::group("g", "G", vec![MenuNode::link("a", "A", "/g/a")])
                .with_permissions(&["g"]),
        ];
        assert!(filter_menu(&tree, &granting(&[])).is_empty());
        assert_eq!(keys(&filter_menu(&tree, &granting(&["g"]))), ["g"]);
    }

    #[test]
    fn permitted_group_is_still_pruned_when_children_are_not() {
        let tree = vec![
            MenuNode::group(
                "g",
                "G",
                vec![MenuNode::link("a", "A", "/g/a").with_permissions(&["a"])],
            )
            .with_permissions(&["g"]),
        ];
        assert!(filter_menu(&tree, &granting(&["g"])).is_empty());
        assert_eq!(keys(&filter_menu(&tree, &granting(&["g", "a"]))), ["g"]);
    }

    #[test]
    fn nested_groups_prune_bottom_up() {
        let tree = vec![MenuNode::group(
            "outer",
            "Outer",
            vec![MenuNode::group(
                "inner",
                "Inner",
                vec![MenuNode::link("leaf", "Leaf", "/x").with_permissions(&["x"])],
            )],
        )];
        assert!(filter_menu(&tree, &granting(&[])).is_empty());
        assert_eq!(keys(&filter_menu(&tree, &granting(&["x"]))), ["outer"]);
    }

    #[test]
    fn preserves_order_and_leaves_source_untouched() {
        let tree = vec![
            MenuNode::link("c", "C", "/c"),
            MenuNode::group(
                "g",
                "G",
                vec![
                    MenuNode::link("g1", "G1", "/g/1").with_permissions(&["no"]),
                    MenuNode::link("g2", "G2", "/g/2"),
                ],
            ),
            MenuNode::external("a", "A", "https://example.com"),
        ];
        let before = tree.clone();

        let filtered = filter_menu(&tree, &granting(&[]));
        assert_eq!(keys(&filtered), ["c", "g", "a"]);
        assert_eq!(keys(filtered[1].children()), ["g2"]);
        assert_eq!(tree, before);

        // 再次过滤得到同样结果
        assert_eq!(filter_menu(&tree, &granting(&["no"]))[1].children().len(), 2);
    }

    struct Flaky {
        calls: RefCell<Vec<String>>,
    }

    impl PermissionCheck for Flaky {
        fn check(&self, permission: &str) -> Result<bool, PermissionError> {
            self.calls.borrow_mut().push(permission.to_owned());
            match permission {
                "ok" => Ok(true),
                _ => Err(PermissionError::Unavailable("session expired".into())),
            }
        }
    }

    #[test]
    fn failing_check_is_treated_as_denied() {
        let tree = vec![
            MenuNode::link("secret", "Secret", "/secret").with_permissions(&["boom"]),
            MenuNode::link("fine", "Fine", "/fine").with_permissions(&["boom", "ok"]),
        ];
        let flaky = Flaky {
            calls: RefCell::new(Vec::new()),
        };
        let filtered = filter_menu(&tree, &flaky);
        assert_eq!(keys(&filtered), ["fine"]);
    }

    #[test]
    fn each_permission_is_asked_once_per_pass() {
        let tree = vec![
            MenuNode::link("a", "A", "/a").with_permissions(&["ok"]),
            MenuNode::link("b", "B", "/b").with_permissions(&["ok"]),
            MenuNode::link("c", "C", "/c").with_permissions(&["ok"]),
        ];
        let flaky = Flaky {
            calls: RefCell::new(Vec::new()),
        };
        filter_menu(&tree, &flaky);
        assert_eq!(*flaky.calls.borrow(), vec!["ok".to_string()]);
    }
}
