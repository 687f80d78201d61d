use super::filter::{filter_menu, PermissionCheck};
use super::node::{MenuDefinition, MenuNode};
use super::open::{self, OpenKeys};
use super::render::{render_menu, MenuEntry};
use std::collections::BTreeSet;

/// 单个访问者的侧边栏状态：可见菜单树 + 展开集合
///
/// 两者都由定义、权限和当前路径整体重算，不做增量修补。
#[derive(Debug, Clone)]
pub struct SidebarState {
    visible: Vec<MenuNode>,
    open_keys: OpenKeys,
    current_path: String,
}

impl SidebarState {
    pub fn compute<P>(definition: &MenuDefinition, perms: &P, current_path: &str) -> Self
    where
        P: PermissionCheck + ?Sized,
    {
        let visible = filter_menu(definition.items(), perms);
        let open_keys = open::resolve_open_keys(&visible, current_path);
        Self {
            visible,
            open_keys,
            current_path: current_path.to_owned(),
        }
    }

    /// 路由变化：手动展开的分组不保留
    #[allow(dead_code)]
    pub fn navigate(&mut self, current_path: &str) {
        self.current_path = current_path.to_owned();
        self.open_keys = open::resolve_open_keys(&self.visible, current_path);
    }

    /// 权限变化：从定义重新过滤，再按当前路径重算展开集合
    #[allow(dead_code)]
    pub fn refresh_permissions<P>(&mut self, definition: &MenuDefinition, perms: &P)
    where
        P: PermissionCheck + ?Sized,
    {
        *self = Self::compute(definition, perms, &self.current_path);
    }

    /// 换用调用方保存的展开集合（例如浏览器端的手动展开状态）
    pub fn restore_open_keys(&mut self, open_keys: OpenKeys) {
        self.open_keys = open_keys;
    }

    pub fn toggle(&mut self, key: &str) {
        self.open_keys = open::toggle(&self.open_keys, key);
    }

    #[allow(dead_code)]
    pub fn visible(&self) -> &[MenuNode] {
        &self.visible
    }

    pub fn open_keys(&self) -> &OpenKeys {
        &self.open_keys
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn highlighted(&self) -> BTreeSet<String> {
        open::highlighted_keys(&self.visible, &self.current_path)
    }

    pub fn entries(&self) -> Vec<MenuEntry> {
        render_menu(&self.visible, &self.open_keys, &self.current_path)
    }
}
